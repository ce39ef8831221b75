//! Resolution of backend image paths to fully-qualified URLs

/// Path segment the backend serves uploaded and generated images under
pub const STATIC_PREFIX: &str = "static/";

/// Append `/` to a base URL that lacks one
pub fn with_trailing_slash(base: &str) -> String {
    if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{}/", base)
    }
}

/// Resolve an image path returned by the backend against `image_base_url`.
///
/// `image_base_url` must already end in `/`. Absolute `http(s)` URLs and
/// `data:` URIs pass through untouched; an empty path stays empty.
pub fn resolve_image_url(image_base_url: &str, path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }
    if is_absolute(path) {
        return path.to_string();
    }

    let path = path.strip_prefix('/').unwrap_or(path);

    if path.starts_with(STATIC_PREFIX) || path.starts_with("/static/") {
        format!("{}{}", image_base_url, path)
    } else {
        format!("{}{}{}", image_base_url, STATIC_PREFIX, path)
    }
}

fn is_absolute(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://") || path.starts_with("data:")
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://host/";

    #[test]
    fn test_empty_path() {
        assert_eq!(resolve_image_url(BASE, ""), "");
    }

    #[test]
    fn test_absolute_urls_unchanged() {
        for url in [
            "http://other/x.png",
            "https://cdn.example.com/static/y.jpg",
            "data:image/png;base64,iVBORw0KGgo=",
        ] {
            assert_eq!(resolve_image_url(BASE, url), url);
            assert_eq!(resolve_image_url("https://elsewhere/", url), url);
        }
    }

    #[test]
    fn test_static_prefix_kept() {
        assert_eq!(
            resolve_image_url(BASE, "static/x.png"),
            "http://host/static/x.png"
        );
        assert_eq!(
            resolve_image_url(BASE, "/static/generated_images/generated_1.jpg"),
            "http://host/static/generated_images/generated_1.jpg"
        );
    }

    #[test]
    fn test_static_prefix_inserted() {
        assert_eq!(resolve_image_url(BASE, "x.png"), "http://host/static/x.png");
        assert_eq!(
            resolve_image_url(BASE, "/uploads/cat.png"),
            "http://host/static/uploads/cat.png"
        );
    }

    #[test]
    fn test_only_one_leading_slash_stripped() {
        assert_eq!(
            resolve_image_url(BASE, "//static/x.png"),
            "http://host//static/x.png"
        );
    }

    #[test]
    fn test_scheme_must_be_complete() {
        assert_eq!(
            resolve_image_url(BASE, "httpbin.png"),
            "http://host/static/httpbin.png"
        );
    }

    #[test]
    fn test_with_trailing_slash() {
        assert_eq!(with_trailing_slash("http://host"), "http://host/");
        assert_eq!(with_trailing_slash("http://host/"), "http://host/");
    }
}
