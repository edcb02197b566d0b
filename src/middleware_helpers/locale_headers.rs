use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};

use crate::locale::LocaleContext;
use crate::AppState;

/// Marks responses with the resolved content language so caches keep the
/// English and Arabic variants apart.
pub async fn locale_headers_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();
    let ctx = LocaleContext::resolve(&parts, state.config.default_locale);
    let mut request = Request::from_parts(parts, body);
    request.extensions_mut().insert(ctx);

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_LANGUAGE,
        HeaderValue::from_static(ctx.locale.as_str()),
    );
    headers.append(
        header::VARY,
        HeaderValue::from_static("accept-language, x-locale"),
    );
    response
}
