//! Fixed assets
//!
//! `/favicon.png`, `/robots.txt` and `/_/{name}` come from the configured
//! asset directory and go through the regular file delivery path.

use std::path::Path;

use super::delivery;
use super::router::RequestContext;
use crate::config::AppState;
use crate::http::body::HttpResponse;
use crate::tree::resolve::normalize;
use crate::tree::{TreeError, TreeResult};

/// Serve `name` from `http.static_dir`
///
/// Without a configured directory every asset is 404.
pub async fn serve_asset(
    ctx: &RequestContext,
    state: &AppState,
    name: &str,
) -> TreeResult<HttpResponse> {
    let Some(dir) = state.config.http.static_dir.as_deref() else {
        return Err(TreeError::NotFound);
    };

    let relative = normalize(name)?;
    if relative.as_os_str().is_empty() {
        return Err(TreeError::NotFound);
    }

    let path = Path::new(dir).join(relative);
    if !tokio::fs::metadata(&path).await?.is_file() {
        return Err(TreeError::NotFound);
    }
    delivery::serve_file(ctx, state.cache(), &path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppState, Config, RootSet};
    use hyper::StatusCode;

    fn state_with_assets(dir: Option<&Path>) -> AppState {
        let mut config = Config::with_defaults();
        config.http.static_dir = dir.map(|d| d.to_string_lossy().into_owned());
        AppState::new(config, RootSet::default())
    }

    #[tokio::test]
    async fn test_serves_asset() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("robots.txt"), b"User-agent: *\n").unwrap();
        let state = state_with_assets(Some(dir.path()));

        let resp = serve_asset(&RequestContext::default(), &state, "robots.txt")
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["content-type"], "text/plain; charset=utf-8");
        assert_eq!(resp.headers()["content-length"], "14");
    }

    #[tokio::test]
    async fn test_missing_and_escaping_assets() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let state = state_with_assets(Some(dir.path()));
        let ctx = RequestContext::default();

        assert!(matches!(
            serve_asset(&ctx, &state, "favicon.png").await,
            Err(TreeError::NotFound)
        ));
        assert!(matches!(
            serve_asset(&ctx, &state, "sub").await,
            Err(TreeError::NotFound)
        ));
        assert!(matches!(
            serve_asset(&ctx, &state, "../secret").await,
            Err(TreeError::Forbidden)
        ));

        let state = state_with_assets(None);
        assert!(matches!(
            serve_asset(&ctx, &state, "robots.txt").await,
            Err(TreeError::NotFound)
        ));
    }
}
