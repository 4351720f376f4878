pub mod download;
pub mod upload;

pub use download::DownloadWorker;
pub use upload::UploadWorker;

/// Round-robin endpoint assignment: worker `index` gets `endpoints[index % len]`.
pub fn upload_endpoint(endpoints: &[String], index: usize) -> Option<&str> {
    if endpoints.is_empty() {
        return None;
    }
    Some(endpoints[index % endpoints.len()].as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_endpoint_round_robin() {
        let endpoints = vec!["http://a/up".to_string(), "http://b/up".to_string()];

        assert_eq!(upload_endpoint(&endpoints, 0), Some("http://a/up"));
        assert_eq!(upload_endpoint(&endpoints, 1), Some("http://b/up"));
        assert_eq!(upload_endpoint(&endpoints, 2), Some("http://a/up"));
        assert_eq!(upload_endpoint(&[], 0), None);
    }
}
