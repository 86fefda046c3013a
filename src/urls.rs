use url::Url;

use crate::animal::Id;

/// Convenience wrapper for URL generation functions.
#[derive(Clone, Debug)]
pub struct Urls {
    /// Top-level URL, including trailing slash.
    base: Url,

    /// Path segment all API routes live under.
    pub(crate) api_path: String,
}

impl Urls {
    /// Create a new instance. `api_path` should *not* include slashes.
    pub fn new(base: &Url, api_path: impl Into<String>) -> Self {
        let mut base = base.clone();

        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Urls {
            base,
            api_path: api_path.into(),
        }
    }

    pub fn api(&self) -> Url {
        self.base
            .join(&format!("{}/", self.api_path))
            .unwrap_or_else(|_| panic!("join {} to {}", self.api_path, self.base))
    }

    pub fn animals(&self) -> Url {
        self.api().join("animals/").expect("get animals URL")
    }

    pub fn animal(&self, id: Id) -> Url {
        self.animals()
            .join(&id.to_string())
            .unwrap_or_else(|_| panic!("get URL for animal {}", id))
    }

    pub fn animals_of_type(&self, tipo: &str) -> Url {
        let mut url = self.animals();
        url.path_segments_mut()
            .expect("base URL must be hierarchical")
            .pop_if_empty()
            .extend(&["tipo", tipo]);

        url
    }

    pub fn test(&self) -> Url {
        self.api().join("test").expect("get test URL")
    }

    pub fn stats(&self) -> Url {
        self.api().join("stats").expect("get stats URL")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(base: &str) -> Urls {
        Urls::new(&Url::parse(base).expect("parse base URL"), "api")
    }

    #[test]
    fn urls_are_built_under_the_api_path() {
        let urls = urls("http://www.example.com");

        assert_eq!(urls.animal(12).as_str(), "http://www.example.com/api/animals/12");
        assert_eq!(urls.test().as_str(), "http://www.example.com/api/test");
    }

    #[test]
    fn base_paths_are_kept() {
        let urls = urls("http://www.example.com/petmatch");

        assert_eq!(urls.animals().as_str(), "http://www.example.com/petmatch/api/animals/");
    }

    #[test]
    fn types_are_escaped() {
        let urls = urls("http://localhost:5000/");

        assert_eq!(
            urls.animals_of_type("gato montés").as_str(),
            "http://localhost:5000/api/animals/tipo/gato%20mont%C3%A9s"
        );
    }
}
