//! Shared test fixtures: an in-memory corpus and a fetch-counting fetcher.
//!
//! The mini corpus is small but fully wired: Genesis 1-2 and Exodus 1 on the
//! Hebrew side, John 1 on the Greek side, Isaiah present only in the verse
//! table, plus one index shard and both Strong's indices. Verse ids follow
//! the row positions in `verses.json`:
//!
//! | vid | ref          | note                               |
//! |-----|--------------|------------------------------------|
//! | 1   | Genesis 1:1  | leading debug marker in raw text   |
//! | 2   | Genesis 1:2  |                                    |
//! | 3   | Genesis 1:3  |                                    |
//! | 4   | (null row)   | padding                            |
//! | 5   | Genesis 2:1  |                                    |
//! | 6   | Exodus 1:1   | no Elohim token                    |
//! | 7   | Isaiah 6:1   | no chapter document                |
//! | 8   | John 1:1     | Greek                              |
//! | 9   | John 1:2     | Greek                              |

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use futures_util::future::BoxFuture;
use serde_json::{json, Value};

use crate::corpus::FetchJson;

/// Per-path fetch counters shared between a [`MemoryFetcher`] and the test
/// that asserts on it.
#[derive(Debug, Default)]
pub struct FetchCounts {
    counts: Mutex<HashMap<String, usize>>,
}

impl FetchCounts {
    fn record(&self, path: &str) {
        let mut counts = self.counts.lock().unwrap();
        *counts.entry(path.to_string()).or_insert(0) += 1;
    }

    /// How many times `path` was fetched, hit or miss.
    pub fn fetches(&self, path: &str) -> usize {
        self.counts.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    /// Total fetches of paths under `prefix`.
    pub fn fetches_with_prefix(&self, prefix: &str) -> usize {
        let counts = self.counts.lock().unwrap();
        counts
            .iter()
            .filter(|(path, _)| path.starts_with(prefix))
            .map(|(_, n)| n)
            .sum()
    }
}

/// A [`FetchJson`] over a fixed in-memory file set. Every fetch is counted,
/// including misses, so tests can assert which documents a code path touches.
pub struct MemoryFetcher {
    files: HashMap<String, Vec<u8>>,
    counts: Arc<FetchCounts>,
}

impl MemoryFetcher {
    pub fn new(files: HashMap<String, Vec<u8>>) -> Self {
        Self {
            files,
            counts: Arc::new(FetchCounts::default()),
        }
    }

    /// The standard fixture described in the module docs.
    pub fn with_mini_corpus() -> Self {
        let mut files = HashMap::new();
        let mut put = |path: &str, doc: Value| {
            files.insert(path.to_string(), doc.to_string().into_bytes());
        };

        put("data/books.json", json!(albanian_book_names()));
        put(
            "data/verses.json",
            json!([
                [1, 1, 1, "aaa see I Në fillim Perëndia krijoi qiejt dhe tokën."],
                [1, 1, 2, "Toka ishte pa trajtë, e zbrazët dhe Fryma e Perëndisë fluturonte mbi sipërfaqen e ujërave."],
                [1, 1, 3, "Pastaj Perëndia tha: \"U bëftë drita!\". Dhe drita u bë."],
                null,
                [1, 2, 1, "Kështu qielli dhe toka u përfunduan, dhe Perëndia mbaroi veprën e tij."],
                [2, 1, 1, "Këta janë emrat e bijve të Izraelit që erdhën në Egjipt me Jakobin."],
                [23, 6, 1, "Në vitin e vdekjes së mbretit Uziah pashë Zotin të ulur mbi një fron të lartë."],
                [43, 1, 1, "Në fillim ishte Fjala dhe Fjala ishte pranë Perëndisë, dhe Fjala ishte Perëndi."],
                [43, 1, 2, "Ai ishte në fillim me Perëndinë."],
            ]),
        );

        put(
            "data/index/index_f.json",
            json!({
                "tokens": {
                    "fillim": [1, 8, 9],
                    "fjala": [8],
                    "fryma": [2],
                    "fluturonte": [2],
                    "fron": [7],
                }
            }),
        );

        put(
            "data/strongs/strongs_H.json",
            json!({
                "index": {
                    "H7225": [1],
                    "H1254": [1],
                    "H0430": [1, 2, 3, 5],
                    "H8064": [1, 5],
                }
            }),
        );
        put(
            "data/strongs/strongs_G.json",
            json!({
                "index": {
                    "G3056": [8],
                    "G1510": [8, 9],
                    "G0746": [8, 9],
                }
            }),
        );

        put(
            "data/genesis/1.json",
            json!({
                "ref": {"book_sq": "Zanafilla", "chapter": 1},
                "verses": [
                    {
                        "v": 1,
                        "sq": "Në fillim Perëndia krijoi qiejt dhe tokën.",
                        "src": [
                            {"i": 0, "w": "בְּ/רֵאשִׁ֖ית", "t": "bə/rēšîṯ", "l": "b/7225", "m": "HR/Ncfsa", "s": "H7225"},
                            {"i": 1, "w": "בָּרָ֣א", "t": "bārā", "l": "1254 a", "m": "HVqp3ms", "s": "H1254"},
                            {"i": 2, "w": "אֱלֹהִ֑ים", "t": "ʾĕlōhîm", "l": "430", "m": "HNcmpa", "s": "H0430"},
                            {"i": 3, "w": "הַ/שָּׁמַ֖יִם", "t": "ha/ššāmayim", "l": "d/8064", "m": "HTd/Ncmpa", "s": "H8064"},
                        ],
                        "align_tok": [
                            {"src": 0, "tgt": [0, 1]},
                            {"src": 1, "tgt": [3]},
                            {"src": 2, "tgt": [2]},
                            {"src": 3, "tgt": [4]},
                        ],
                    },
                    {
                        "v": 2,
                        "sq": "Toka ishte pa trajtë, e zbrazët dhe Fryma e Perëndisë fluturonte mbi sipërfaqen e ujërave.",
                        "src": [
                            {"i": 0, "w": "וְ/הָ/אָ֗רֶץ", "t": "wə/hā/ʾāreṣ", "l": "c/d/776", "m": "HC/Td/Ncbsa", "s": "H0776"},
                            {"i": 1, "w": "ר֣וּחַ", "t": "rûaḥ", "l": "7307", "m": "HNcbsc", "s": "H7307"},
                            {"i": 2, "w": "אֱלֹהִ֔ים", "t": "ʾĕlōhîm", "l": "430", "m": "HNcmpa", "s": "H0430"},
                        ],
                        "align_tok": [
                            {"src": 0, "tgt": [0]},
                            {"src": 1, "tgt": [7]},
                            {"src": 2, "tgt": [9]},
                        ],
                    },
                    {
                        "v": 3,
                        "sq": "Pastaj Perëndia tha: \"U bëftë drita!\". Dhe drita u bë.",
                        "src": [
                            {"i": 0, "w": "וַ/יֹּ֥אמֶר", "t": "wa/yyōmer", "l": "c/559", "m": "HC/Vqw3ms", "s": "H0559"},
                            {"i": 1, "w": "אֱלֹהִ֖ים", "t": "ʾĕlōhîm", "l": "430", "m": "HNcmpa", "s": "H0430"},
                            {"i": 2, "w": "א֑וֹר", "t": "ʾôr", "l": "216", "m": "HNcbsa", "s": "H0216"},
                        ],
                        "align_tok": [
                            {"src": 0, "tgt": [2]},
                            {"src": 1, "tgt": [1]},
                            {"src": 2, "tgt": [5]},
                        ],
                    },
                ],
                "_meta": {"lang_src": "heb", "lang_tgt": "sq"},
            }),
        );
        put(
            "data/genesis/2.json",
            json!({
                "ref": {"book_sq": "Zanafilla", "chapter": 2},
                "verses": [
                    {
                        "v": 1,
                        "sq": "Kështu qielli dhe toka u përfunduan, dhe Perëndia mbaroi veprën e tij.",
                        "src": [
                            {"i": 0, "w": "וַ/יְכֻלּ֛וּ", "t": "wa/yḵullû", "l": "c/3615", "m": "HC/VPw3mp", "s": "H3615"},
                            {"i": 1, "w": "הַ/שָּׁמַ֥יִם", "t": "ha/ššāmayim", "l": "d/8064", "m": "HTd/Ncmpa", "s": "H8064"},
                            {"i": 2, "w": "אֱלֹהִ֗ים", "t": "ʾĕlōhîm", "l": "430", "m": "HNcmpa", "s": "H0430"},
                        ],
                        "align_tok": [
                            {"src": 0, "tgt": [4]},
                            {"src": 1, "tgt": [1]},
                            {"src": 2, "tgt": [7]},
                        ],
                    },
                ],
                "_meta": {"lang_src": "heb", "lang_tgt": "sq"},
            }),
        );
        put(
            "data/exodus/1.json",
            json!({
                "ref": {"book_sq": "Eksodi", "chapter": 1},
                "verses": [
                    {
                        "v": 1,
                        "sq": "Këta janë emrat e bijve të Izraelit që erdhën në Egjipt me Jakobin.",
                        "src": [
                            {"i": 0, "w": "וְ/אֵ֗לֶּה", "t": "wə/ʾēlleh", "l": "c/428", "m": "HC/Pdxcp", "s": "H0428"},
                            {"i": 1, "w": "שְׁמוֹת֙", "t": "šəmôṯ", "l": "8034", "m": "HNcmpc", "s": "H8034"},
                        ],
                        "align_tok": [
                            {"src": 0, "tgt": [0]},
                            {"src": 1, "tgt": [2]},
                        ],
                    },
                ],
                "_meta": {"lang_src": "heb", "lang_tgt": "sq"},
            }),
        );
        put(
            "data/john/1.json",
            json!({
                "ref": {"book_sq": "Gjoni", "chapter": 1},
                "verses": [
                    {
                        "v": 1,
                        "sq": "Në fillim ishte Fjala dhe Fjala ishte pranë Perëndisë, dhe Fjala ishte Perëndi.",
                        "src": [
                            {"i": 0, "w": "Ἐν", "t": "En", "l": "ἐν", "m": "PREP", "s": "G1722"},
                            {"i": 1, "w": "ἀρχῇ", "t": "archē", "l": "ἀρχή", "m": "N-DSF", "s": "G0746"},
                            {"i": 2, "w": "ἦν", "t": "ēn", "l": "εἰμί", "m": "V-IAI-3S", "s": "G1510"},
                            {"i": 3, "w": "ὁ", "t": "ho", "l": "ὁ", "m": "T-NSM", "s": "G3588"},
                            {"i": 4, "w": "λόγος", "t": "logos", "l": "λόγος", "m": "N-NSM", "s": "G3056"},
                        ],
                        "align_tok": [
                            {"src": 0, "tgt": [0]},
                            {"src": 1, "tgt": [1]},
                            {"src": 2, "tgt": [2]},
                            {"src": 4, "tgt": [3]},
                        ],
                    },
                    {
                        "v": 2,
                        "sq": "Ai ishte në fillim me Perëndinë.",
                        "src": [
                            {"i": 0, "w": "Οὗτος", "t": "Houtos", "l": "οὗτος", "m": "D-NSM", "s": "G3778"},
                            {"i": 1, "w": "ἦν", "t": "ēn", "l": "εἰμί", "m": "V-IAI-3S", "s": "G1510"},
                            {"i": 2, "w": "ἀρχῇ", "t": "archē", "l": "ἀρχή", "m": "N-DSF", "s": "G0746"},
                        ],
                        "align_tok": [
                            {"src": 0, "tgt": [0]},
                            {"src": 1, "tgt": [1]},
                            {"src": 2, "tgt": [3]},
                        ],
                    },
                ],
                "_meta": {"lang_src": "grc", "lang_tgt": "sq"},
            }),
        );

        Self::new(files)
    }

    /// Drops one document from the file set, turning it into a miss.
    pub fn without(mut self, path: &str) -> Self {
        self.files.remove(path);
        self
    }

    pub fn counts(&self) -> Arc<FetchCounts> {
        Arc::clone(&self.counts)
    }
}

impl FetchJson for MemoryFetcher {
    fn fetch<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>>> {
        self.counts.record(path);
        let bytes = self.files.get(path).cloned();
        Box::pin(async move { Ok(bytes) })
    }
}

/// The 66 book display names as shipped in `data/books.json`, index 0 =
/// book id 1.
pub fn albanian_book_names() -> Vec<String> {
    [
        "Zanafilla",
        "Eksodi",
        "Levitiku",
        "Numrat",
        "Ligji i Përtërirë",
        "Jozueu",
        "Gjyqtarët",
        "Ruthi",
        "1 i Samuelit",
        "2 i Samuelit",
        "1 i Mbretërve",
        "2 i Mbretërve",
        "1 i Kronikave",
        "2 i Kronikave",
        "Ezra",
        "Nehemia",
        "Estera",
        "Jobi",
        "Psalmet",
        "Fjalët e Urta",
        "Predikuesi",
        "Kënga e Këngëve",
        "Isaia",
        "Jeremia",
        "Vajtimet",
        "Ezekieli",
        "Danieli",
        "Osea",
        "Joeli",
        "Amosi",
        "Abdia",
        "Jona",
        "Mika",
        "Nahumi",
        "Habakuku",
        "Sofonia",
        "Hagaiu",
        "Zakaria",
        "Malakia",
        "Mateu",
        "Marku",
        "Luka",
        "Gjoni",
        "Veprat e Apostujve",
        "Romakëve",
        "1 Korintasve",
        "2 Korintasve",
        "Galatasve",
        "Efesianëve",
        "Filipianëve",
        "Kolosianëve",
        "1 Thesalonikasve",
        "2 Thesalonikasve",
        "1 Timoteut",
        "2 Timoteut",
        "Titit",
        "Filemonit",
        "Hebrenjve",
        "Jakobi",
        "1 Pjetrit",
        "2 Pjetrit",
        "1 Gjonit",
        "2 Gjonit",
        "3 Gjonit",
        "Juda",
        "Zbulesa e Gjonit",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}
