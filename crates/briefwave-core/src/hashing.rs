/// MD5(url), hex-encoded — the article uniqueness hash of spec §4.1
/// step 1 and the invariant of spec §8 ("the uniqueness hash equals
/// MD5 of the URL").
pub fn uniqueness_hash(url: &str) -> String {
    format!("{:x}", md5::compute(url.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic_and_matches_md5() {
        let a = uniqueness_hash("https://example.com/a");
        let b = uniqueness_hash("https://example.com/a");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn different_urls_hash_differently() {
        assert_ne!(
            uniqueness_hash("https://example.com/a"),
            uniqueness_hash("https://example.com/b")
        );
    }
}
