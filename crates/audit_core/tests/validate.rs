use audit_core::{display_name, is_valid_url, validate_url, ValidationError};

#[test]
fn accepts_absolute_urls_with_authority() {
    for input in [
        "https://example.com",
        "http://example.com:8080/path?q=1#frag",
        "https://sub.www.example.co.uk/",
        "ftp://files.example.com/a.csv",
        "https://127.0.0.1/",
    ] {
        assert!(is_valid_url(input), "{input} should be valid");
    }
}

#[test]
fn rejects_relative_and_malformed_input() {
    for input in [
        "",
        "not a url",
        "example.com",
        "/relative/path",
        "//example.com",
        "https://",
        "http://exa mple.com",
    ] {
        assert!(!is_valid_url(input), "{input:?} should be invalid");
    }
}

#[test]
fn distinguishes_empty_from_malformed() {
    assert_eq!(validate_url(" \t"), Err(ValidationError::Empty));
    assert_eq!(validate_url("nope"), Err(ValidationError::Malformed));
    assert_eq!(
        validate_url("https://example.com").unwrap().host_str(),
        Some("example.com")
    );
}

#[test]
fn display_name_falls_back_to_input() {
    assert_eq!(display_name("https://www.example.com/page"), "example.com");
    assert_eq!(display_name("https://Example.COM"), "example.com");
    assert_eq!(display_name("not a url"), "not a url");
    assert_eq!(display_name(""), "Unknown");
}
