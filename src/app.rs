//! Demo application served by the `dialogue` binary.
//!
//! ```text
//! /                    greeting
//! /home                redirect to /
//! /<id:int>/info       item info
//! /user/<id:uuid4>     JSON echo of path params
//! /at/<when:datetime>  JSON echo of path params
//! /protected           Basic auth, when configured
//! /oauth/protected     OAuth2 bearer, when configured
//! /files/<name:string> file under files.root, when configured
//! anything else        404
//! ```

use std::path::{Path, PathBuf};

use axum::http::StatusCode;
use serde_json::json;

use crate::chain;
use crate::config::AppConfig;
use crate::dispatch::{Chain, Dialogue};
use crate::http::response::{
    not_found_handler, redirect_to, serve_file, write_error, write_json, write_string,
};
use crate::routing::{switch, PatternError, RouteTable, TypedValue};
use crate::security::{basic_auth, oauth2};

/// Build the root handler: the route switch followed by the 404 fallback.
pub fn build_routes(config: &AppConfig) -> Result<Chain, PatternError> {
    let mut table = RouteTable::new()
        .route("/", index)?
        .route("/home", |d: Dialogue| redirect_to(d, "/", StatusCode::MOVED_PERMANENTLY))?
        .route("/<id:int>/info", item_info)?
        .route("/user/<id:uuid4>", echo_params)?
        .route("/at/<when:datetime>", echo_params)?;

    if let Some(basic) = &config.auth.basic {
        table = table.route("/protected", chain![basic_auth(basic.clone()), protected])?;
    }
    if let Some(oauth) = &config.auth.oauth2 {
        table = table.route("/oauth/protected", oauth2(oauth, protected))?;
    }
    if let Some(root) = &config.files.root {
        let root = root.clone();
        table = table.route("/files/<name:string>", move |d: Dialogue| {
            serve_named_file(d, &root)
        })?;
    }

    tracing::info!(routes = table.len(), "Demo routes registered");
    Ok(chain![switch(table), not_found_handler()])
}

fn index(d: Dialogue) -> Dialogue {
    write_string(d, StatusCode::OK, "Hello from dialogue\n")
}

fn item_info(d: Dialogue) -> Dialogue {
    match d.param("id").and_then(TypedValue::as_int) {
        Some(id) => write_json(d, StatusCode::OK, &json!({ "id": id, "kind": "item" })),
        None => write_error(d, StatusCode::INTERNAL_SERVER_ERROR, "missing id"),
    }
}

fn echo_params(d: Dialogue) -> Dialogue {
    let params = d.path_params().cloned().unwrap_or_default();
    write_json(d, StatusCode::OK, &params)
}

fn protected(d: Dialogue) -> Dialogue {
    write_json(d, StatusCode::OK, &json!({ "message": "authenticated" }))
}

fn serve_named_file(d: Dialogue, root: &Path) -> Dialogue {
    let name = match d.param("name").and_then(TypedValue::as_str) {
        Some(name) => name.to_string(),
        None => return write_error(d, StatusCode::BAD_REQUEST, "missing file name"),
    };
    match resolve_file(root, &name) {
        Some(path) => serve_file(d, path),
        None => {
            tracing::warn!(name = %name, "Rejected file name");
            write_error(d, StatusCode::BAD_REQUEST, "invalid file name")
        }
    }
}

/// Join `name` under `root`, refusing anything that could leave it.
fn resolve_file(root: &Path, name: &str) -> Option<PathBuf> {
    if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\']) {
        return None;
    }
    Some(root.join(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::{header, Request};
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    use crate::config::{BasicAuthConfig, FilesConfig, OAuth2Config};
    use crate::dispatch::Handler;

    fn run(handler: &Chain, path: &str, authorization: Option<&str>) -> Dialogue {
        let mut builder = Request::builder().uri(path);
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        Dialogue::new(builder.body(Bytes::new()).unwrap()).map(handler)
    }

    fn body(d: &Dialogue) -> String {
        String::from_utf8(d.response().body().to_vec()).unwrap()
    }

    #[test]
    fn test_resolve_file() {
        let root = Path::new("/srv");
        assert_eq!(resolve_file(root, "a.txt"), Some(PathBuf::from("/srv/a.txt")));
        assert_eq!(resolve_file(root, ".."), None);
        assert_eq!(resolve_file(root, ".env"), None);
        assert_eq!(resolve_file(root, "a/b"), None);
        assert_eq!(resolve_file(root, ""), None);
    }

    #[test]
    fn test_index_and_fallback() {
        let handler = build_routes(&AppConfig::default()).unwrap();

        let d = run(&handler, "/", None);
        assert_eq!(d.response().status(), StatusCode::OK);
        assert_eq!(body(&d), "Hello from dialogue\n");

        let d = run(&handler, "/nowhere", None);
        assert_eq!(d.response().status(), StatusCode::NOT_FOUND);
        assert_eq!(d.logs(), ["Sent 404 Not Found"]);
    }

    #[test]
    fn test_item_info_requires_int() {
        let handler = build_routes(&AppConfig::default()).unwrap();

        let d = run(&handler, "/123/info", None);
        assert_eq!(d.response().status(), StatusCode::OK);
        let value: serde_json::Value = serde_json::from_slice(d.response().body()).unwrap();
        assert_eq!(value["id"], 123);

        let d = run(&handler, "/abc/info", None);
        assert_eq!(d.response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_user_echoes_uuid() {
        let handler = build_routes(&AppConfig::default()).unwrap();
        let id = "0b7f2c3e-4a1d-4f5e-9c8b-7a6d5e4f3c2b";
        let d = run(&handler, &format!("/user/{id}"), None);
        assert_eq!(d.response().status(), StatusCode::OK);
        let value: serde_json::Value = serde_json::from_slice(d.response().body()).unwrap();
        assert_eq!(value["id"], id);
    }

    #[test]
    fn test_home_redirects() {
        let handler = build_routes(&AppConfig::default()).unwrap();
        let d = run(&handler, "/home", None);
        assert_eq!(d.response().status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(d.response().header("location"), Some("/"));
    }

    #[test]
    fn test_protected_routes_absent_without_config() {
        let handler = build_routes(&AppConfig::default()).unwrap();
        assert_eq!(run(&handler, "/protected", None).response().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            run(&handler, "/oauth/protected", Some("Bearer t")).response().status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_basic_protected() {
        let mut config = AppConfig::default();
        config.auth.basic = Some(BasicAuthConfig::new("admin", "secret"));
        let handler = build_routes(&config).unwrap();

        let good = format!("Basic {}", STANDARD.encode("admin:secret"));
        let d = run(&handler, "/protected", Some(&good));
        assert_eq!(d.response().status(), StatusCode::OK);
        assert_eq!(d.logs(), ["Authenticated admin"]);

        let bad = format!("Basic {}", STANDARD.encode("admin:wrong"));
        let d = run(&handler, "/protected", Some(&bad));
        assert_eq!(d.response().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body(&d), "Unauthorized");
    }

    #[test]
    fn test_oauth_protected() {
        let mut config = AppConfig::default();
        config.auth.oauth2 = Some(OAuth2Config::default());
        let handler = build_routes(&config).unwrap();

        assert_eq!(
            run(&handler, "/oauth/protected", Some("Bearer mock")).response().status(),
            StatusCode::OK
        );
        assert_eq!(
            run(&handler, "/oauth/protected", None).response().status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_files_served_from_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.txt"), "hi there").unwrap();

        let mut config = AppConfig::default();
        config.files = FilesConfig {
            root: Some(dir.path().to_path_buf()),
        };
        let handler = build_routes(&config).unwrap();

        let d = run(&handler, "/files/hello.txt", None);
        assert_eq!(d.response().status(), StatusCode::OK);
        assert_eq!(body(&d), "hi there");

        let d = run(&handler, "/files/missing.txt", None);
        assert_eq!(d.response().status(), StatusCode::NOT_FOUND);

        let d = run(&handler, "/files/%2E%2E", None);
        assert_eq!(d.response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_chain_is_a_handler() {
        let handler = build_routes(&AppConfig::default()).unwrap();
        let request = Request::builder().uri("/").body(Bytes::new()).unwrap();
        assert!(handler.handle(Dialogue::new(request)).is_terminated());
    }
}
