mod alignment;
mod books;
mod corpus;
mod error;
mod normalize;
mod reference;
mod scanner;
mod search;
mod state;
mod tokens;
mod verse_index;

#[cfg(test)]
mod testutil;

use std::env;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

use alignment::{align_chapter, align_verse_in, build_source_text, ChapterAlignment, VerseAlignment};
use books::{fallback_book_name, source_lang_for_book};
use corpus::{Corpus, FetchJson, FsFetcher, HttpFetcher};
use error::EngineError;
use reference::{find_reference, ReferenceTarget};
use search::{run_search, SearchMode, SearchResults};
use state::{AppState, LastSearch};
use tokens::SourceLang;
use verse_index::{chapter_views, verse_view, VerseView};

// === Request/Response types ===

#[derive(Deserialize)]
struct SearchQuery {
    q: String,
    mode: Option<SearchMode>,
}

#[derive(Deserialize)]
struct ReferenceQuery {
    q: String,
}

#[derive(Deserialize)]
struct ChapterQuery {
    book: String,
    chapter: u32,
}

#[derive(Deserialize)]
struct InterlinearQuery {
    book: String,
    chapter: u32,
    verse: Option<u32>,
}

#[derive(Deserialize)]
struct SourceTextQuery {
    book: String,
    chapter: u32,
    verse: u32,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    books: usize,
    verses: usize,
}

#[derive(Serialize)]
struct BookListing {
    id: u16,
    name: String,
    /// Source language of the book's interlinear column; also marks the
    /// testament boundary for grouped display.
    lang: SourceLang,
    chapters: Vec<u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
enum ReferenceResponse {
    Verse { verse: VerseView },
    Chapter { book_id: u16, chapter: u32, verses: Vec<VerseView> },
}

#[derive(Serialize)]
struct ChapterResponse {
    book_id: u16,
    book: String,
    chapter: u32,
    verses: Vec<VerseView>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum InterlinearResponse {
    Chapter(Box<ChapterAlignment>),
    Verse(Box<VerseAlignment>),
}

#[derive(Serialize)]
struct SourceTextResponse {
    book_id: u16,
    chapter: u32,
    verse: u32,
    lang: SourceLang,
    text: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_reply(err: EngineError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &err {
        EngineError::NotFound(_)
        | EngineError::BookNotFound(_)
        | EngineError::VerseNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::MalformedReference(_) | EngineError::InvalidQuery(_) => {
            StatusCode::BAD_REQUEST
        }
        EngineError::Corpus(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse { error: err.to_string() }))
}

/// The `book` query parameter accepts a numeric id or a directory slug.
fn parse_book_param(book: &str) -> Result<u16, EngineError> {
    if let Ok(id) = book.parse::<u16>() {
        if books::book_slug(id).is_some() {
            return Ok(id);
        }
    } else if let Some(id) = books::book_id_for_slug(book) {
        return Ok(id);
    }
    Err(EngineError::BookNotFound(book.to_string()))
}

// === Handlers ===

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let books = state.corpus().books().await.map(|b| b.len()).unwrap_or(0);
    let verses = state.corpus().verses().await.map(|v| v.len()).unwrap_or(0);
    Json(HealthResponse {
        status: "ok".to_string(),
        books,
        verses,
    })
}

async fn search_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResults>, (StatusCode, Json<ErrorResponse>)> {
    let mode = params.mode.unwrap_or_default();

    // Scan progress is drained into the log; the HTTP response carries only
    // the final result set.
    let (tx, mut rx) = mpsc::unbounded_channel::<scanner::ScanProgress>();
    tokio::spawn(async move {
        while let Some(p) = rx.recv().await {
            tracing::debug!(scanned = p.scanned, total = p.total, found = p.found, "scan progress");
        }
    });

    run_search(&state, &params.q, mode, Some(tx))
        .await
        .map(Json)
        .map_err(error_reply)
}

async fn last_search_handler(State(state): State<Arc<AppState>>) -> Json<Option<LastSearch>> {
    Json(state.last_search())
}

async fn reference_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReferenceQuery>,
) -> Result<Json<ReferenceResponse>, (StatusCode, Json<ErrorResponse>)> {
    reference_inner(&state, &params.q).await.map(Json).map_err(error_reply)
}

async fn reference_inner(state: &AppState, q: &str) -> Result<ReferenceResponse, EngineError> {
    let book_index = state.book_index().await?;
    let verse_index = state.verse_index().await?;
    let target = find_reference(q, &book_index, &verse_index)?;

    let (books, rows) = tokio::try_join!(state.corpus().books(), state.corpus().verses())?;
    match target {
        ReferenceTarget::Verse { verse_id } => {
            let verse = verse_view(&books, &rows, verse_id)
                .ok_or_else(|| EngineError::VerseNotFound(q.trim().to_string()))?;
            Ok(ReferenceResponse::Verse { verse })
        }
        ReferenceTarget::Chapter { book_id, chapter } => {
            let verses = chapter_views(&books, &rows, book_id, chapter);
            if verses.is_empty() {
                return Err(EngineError::NotFound(q.trim().to_string()));
            }
            Ok(ReferenceResponse::Chapter { book_id, chapter, verses })
        }
    }
}

async fn books_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<BookListing>>, (StatusCode, Json<ErrorResponse>)> {
    books_inner(&state).await.map(Json).map_err(error_reply)
}

async fn books_inner(state: &AppState) -> Result<Vec<BookListing>, EngineError> {
    let books = state.corpus().books().await?;
    let verse_index = state.verse_index().await?;
    Ok(books
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let id = (i + 1) as u16;
            BookListing {
                id,
                name: name.clone(),
                lang: source_lang_for_book(id),
                chapters: verse_index.chapters(id).to_vec(),
            }
        })
        .collect())
}

async fn chapter_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ChapterQuery>,
) -> Result<Json<ChapterResponse>, (StatusCode, Json<ErrorResponse>)> {
    chapter_inner(&state, &params.book, params.chapter)
        .await
        .map(Json)
        .map_err(error_reply)
}

async fn chapter_inner(
    state: &AppState,
    book: &str,
    chapter: u32,
) -> Result<ChapterResponse, EngineError> {
    let book_id = parse_book_param(book)?;
    let (books, rows) = tokio::try_join!(state.corpus().books(), state.corpus().verses())?;
    let verses = chapter_views(&books, &rows, book_id, chapter);
    if verses.is_empty() {
        return Err(EngineError::NotFound(format!("{book} {chapter}")));
    }
    let name = books
        .get(book_id as usize - 1)
        .cloned()
        .unwrap_or_else(|| fallback_book_name(book_id));
    Ok(ChapterResponse { book_id, book: name, chapter, verses })
}

async fn interlinear_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<InterlinearQuery>,
) -> Result<Json<InterlinearResponse>, (StatusCode, Json<ErrorResponse>)> {
    interlinear_inner(&state, &params.book, params.chapter, params.verse)
        .await
        .map(Json)
        .map_err(error_reply)
}

async fn interlinear_inner(
    state: &AppState,
    book: &str,
    chapter: u32,
    verse: Option<u32>,
) -> Result<InterlinearResponse, EngineError> {
    let book_id = parse_book_param(book)?;
    let doc = state
        .corpus()
        .chapter(book_id, chapter)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("{book} {chapter}")))?;
    match verse {
        None => Ok(InterlinearResponse::Chapter(Box::new(align_chapter(&doc)))),
        Some(v) => align_verse_in(&doc, v)
            .map(|aligned| InterlinearResponse::Verse(Box::new(aligned)))
            .ok_or_else(|| EngineError::VerseNotFound(format!("{book} {chapter}:{v}"))),
    }
}

async fn source_text_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SourceTextQuery>,
) -> Result<Json<SourceTextResponse>, (StatusCode, Json<ErrorResponse>)> {
    source_text_inner(&state, &params.book, params.chapter, params.verse)
        .await
        .map(Json)
        .map_err(error_reply)
}

async fn source_text_inner(
    state: &AppState,
    book: &str,
    chapter: u32,
    verse: u32,
) -> Result<SourceTextResponse, EngineError> {
    let book_id = parse_book_param(book)?;
    let doc = state
        .corpus()
        .chapter(book_id, chapter)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("{book} {chapter}")))?;
    let entry = doc
        .verse(verse)
        .ok_or_else(|| EngineError::VerseNotFound(format!("{book} {chapter}:{verse}")))?;
    let lang = doc.source_lang();
    Ok(SourceTextResponse {
        book_id,
        chapter,
        verse,
        lang,
        text: build_source_text(entry, lang),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let data = env::var("KONKORDANCA_DATA").unwrap_or_else(|_| "./site".to_string());
    let fetcher: Box<dyn FetchJson> = if data.starts_with("http://") || data.starts_with("https://")
    {
        Box::new(HttpFetcher::new(data.as_str()))
    } else {
        Box::new(FsFetcher::new(data.as_str()))
    };
    let state = Arc::new(AppState::new(Corpus::new(fetcher)));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/search", get(search_handler))
        .route("/search/last", get(last_search_handler))
        .route("/reference", get(reference_handler))
        .route("/books", get(books_handler))
        .route("/chapter", get(chapter_handler))
        .route("/interlinear", get(interlinear_handler))
        .route("/source-text", get(source_text_handler))
        .layer(cors)
        .with_state(state);

    let addr = env::var("KONKORDANCA_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Serving corpus from {data} on http://{addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
