//! Translate route - upload a PDF, get the translated PDF back.

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::Response,
};
use axum_extra::extract::Multipart;
use blocktrans_core::{
    Lang, LayoutMode, PageRange, PdfDocument, PreparedDocument, TextColor, TranslateJob,
    output_filename,
};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::helpers::{attachment_disposition, CoreResultExt, ResultExt, RouteResult};
use crate::state::{AppState, TranslateSettings};

/// Fields of the upload form.
#[derive(Debug, Default)]
struct TranslateForm {
    filename: Option<String>,
    data: Option<Vec<u8>>,
    source_lang: Option<String>,
    target_lang: Option<String>,
    /// 1-based
    from_page: Option<String>,
    /// 1-based, 0 = last page
    to_page: Option<String>,
    font_size: Option<String>,
    line_height: Option<String>,
    color: Option<String>,
    fixed: bool,
}

impl TranslateForm {
    async fn read(multipart: &mut Multipart) -> RouteResult<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.or_bad_request()? {
            let name = field.name().unwrap_or("").to_string();
            if name == "file" {
                form.filename = field.file_name().map(ToString::to_string);
                form.data = Some(field.bytes().await.or_bad_request()?.to_vec());
                continue;
            }

            let value = field.text().await.or_bad_request()?;
            let value = Some(value.trim().to_string()).filter(|v| !v.is_empty());
            match name.as_str() {
                "source_lang" => form.source_lang = value,
                "target_lang" => form.target_lang = value,
                "from_page" => form.from_page = value,
                "to_page" => form.to_page = value,
                "font_size" => form.font_size = value,
                "line_height" => form.line_height = value,
                "color" => form.color = value,
                "fixed" => form.fixed = value.is_some(),
                _ => debug!("Ignoring form field {}", name),
            }
        }

        Ok(form)
    }

    fn settings(&self, state: &AppState) -> RouteResult<TranslateSettings> {
        let color = match self.color.as_deref() {
            Some(name) => Some(
                TextColor::from_name(name)
                    .ok_or_else(|| (StatusCode::BAD_REQUEST, format!("Unknown color '{name}'")))?,
            ),
            None => None,
        };

        Ok(TranslateSettings {
            source_lang: self
                .source_lang
                .as_deref()
                .map_or_else(|| state.config.source_lang.clone(), Lang::from),
            target_lang: self
                .target_lang
                .as_deref()
                .map_or_else(|| state.config.target_lang.clone(), Lang::from),
            text_color: color,
            font_size: parse_field(self.font_size.as_deref(), "font_size")?,
            line_height: parse_field(self.line_height.as_deref(), "line_height")?,
            layout: self.fixed.then_some(LayoutMode::Fixed),
        })
    }

    fn page_range(&self, page_count: usize) -> RouteResult<PageRange> {
        let from = parse_field(self.from_page.as_deref(), "from_page")?.unwrap_or(1);
        let to = parse_field(self.to_page.as_deref(), "to_page")?.unwrap_or(0);
        PageRange::from_one_based(from, to, page_count).or_status()
    }
}

fn parse_field<T: std::str::FromStr>(value: Option<&str>, field: &str) -> RouteResult<Option<T>> {
    value
        .map(|v| {
            v.parse()
                .map_err(|_| (StatusCode::BAD_REQUEST, format!("Invalid {field}: '{v}'")))
        })
        .transpose()
}

/// Run mupdf/lopdf work off the async runtime.
async fn blocking<T, F>(what: &'static str, f: F) -> RouteResult<T>
where
    F: FnOnce() -> blocktrans_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            error!("{} task panicked: {}", what, e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{what} failed"))
        })?
        .or_status()
}

/// Translate an uploaded PDF and return it as an attachment.
///
/// Report counts are sent in `X-Blocks-*` headers.
pub async fn translate_pdf(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> RouteResult<Response> {
    let form = TranslateForm::read(&mut multipart).await?;
    let settings = form.settings(&state)?;

    let data = form
        .data
        .clone()
        .filter(|d| !d.is_empty())
        .ok_or_else(|| (StatusCode::BAD_REQUEST, "No PDF uploaded".to_string()))?;
    let filename = form.filename.clone().unwrap_or_else(|| "document.pdf".to_string());

    let doc = blocking("PDF parsing", move || PdfDocument::from_bytes(data)).await?;

    let range = form.page_range(doc.page_count())?;
    let translator = state.create_translator(&settings).or_status()?;

    let job = TranslateJob::new(translator.config())
        .with_range(range)
        .with_progress(|p| debug!("Progress {:.0}% (page {})", p.fraction() * 100.0, p.page + 1));
    translator.check_job(&job).or_status()?;

    info!(
        "Translating {} (pages {}, {} -> {})",
        filename, range, settings.source_lang, settings.target_lang
    );

    let config = translator.config().clone();
    let target = job.target_lang.clone();
    let prepared = blocking("PDF preparation", move || {
        PreparedDocument::prepare(&doc, &config, Some(range), &target)
    })
    .await?;

    let overlaid = translator
        .translate_prepared(prepared, &job)
        .await
        .or_status()
        .inspect_err(|(_, e)| error!("Translation of {} failed: {}", filename, e))?;
    let translated = blocking("PDF saving", move || overlaid.save()).await?;

    let report = &translated.report;
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(
            header::CONTENT_DISPOSITION,
            attachment_disposition(&output_filename(&filename)),
        )
        .header("X-Pages-Processed", report.pages_processed)
        .header("X-Blocks-Total", report.blocks_total)
        .header("X-Blocks-Translated", report.translated)
        .header("X-Blocks-Untranslated", report.passthrough)
        .header("X-Blocks-Skipped", report.skipped_empty)
        .header("X-Blocks-Render-Failed", report.render_failed)
        .header("X-Blocks-Lossy", report.lossy)
        .body(Body::from(translated.bytes))
        .or_internal_error()
}
