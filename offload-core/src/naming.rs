//! Deterministic function-name derivation and image reference parsing.
//!
//! `offload-<slug>-<hash12>`: the slug keeps names readable, the hash (over
//! code kind and identity) keeps distinct deployables apart even when their
//! slugs collide.

use sha2::{Digest, Sha256};

use crate::types::{CodeReference, FunctionName};

const NAME_PREFIX: &str = "offload";
const SLUG_MAX: usize = 32;
const HASH_CHARS: usize = 12;

/// Tag treated as mutable by the registry.
pub const FLOATING_TAG: &str = "latest";

/// Derive the remote function name from a code reference's normalized identity.
pub fn derive_function_name(code: &CodeReference) -> FunctionName {
    let identity = code.normalized_identity();
    let kind = match code {
        CodeReference::ContainerImage { .. } => "image",
        CodeReference::PackagedArchive(_) => "archive",
    };
    let digest = {
        let mut h = Sha256::new();
        h.update(kind.as_bytes());
        h.update(b":");
        h.update(identity.as_bytes());
        hex::encode(h.finalize())
    };
    let slug = slugify(identity.rsplit('/').next().unwrap_or(&identity));
    let hash = &digest[..HASH_CHARS];
    if slug.is_empty() {
        FunctionName(format!("{NAME_PREFIX}-{hash}"))
    } else {
        FunctionName(format!("{NAME_PREFIX}-{slug}-{hash}"))
    }
}

/// Parsed `registry/repository[:tag][@digest]` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference<'a> {
    pub repository: &'a str,
    pub tag: Option<&'a str>,
    pub digest: Option<&'a str>,
}

/// Split an image URI into repository, tag and digest.
///
/// A `:` before the last `/` belongs to a registry port, not a tag.
pub fn parse_image(uri: &str) -> ImageReference<'_> {
    let uri = strip_scheme(uri.trim());
    let (rest, digest) = match uri.split_once('@') {
        Some((rest, digest)) => (rest, Some(digest)),
        None => (uri, None),
    };
    let last_slash = rest.rfind('/').map(|i| i + 1).unwrap_or(0);
    match rest[last_slash..].rfind(':') {
        Some(colon) => {
            let split = last_slash + colon;
            ImageReference {
                repository: &rest[..split],
                tag: Some(&rest[split + 1..]),
                digest,
            }
        }
        None => ImageReference {
            repository: rest,
            tag: None,
            digest,
        },
    }
}

/// Whether the image's content can change without its URI changing.
///
/// `latest` is floating; so is a reference with neither tag nor digest,
/// which the registry resolves to `latest`.
pub fn is_floating_tag(uri: &str) -> bool {
    let image = parse_image(uri);
    match (image.tag, image.digest) {
        (_, Some(_)) => false,
        (Some(tag), None) => tag == FLOATING_TAG,
        (None, None) => true,
    }
}

/// Lower-cased, scheme-less repository with tag and digest removed.
pub fn normalize_image(uri: &str) -> String {
    parse_image(uri)
        .repository
        .trim_end_matches('/')
        .to_ascii_lowercase()
}

/// Content-store key with surrounding whitespace and slashes removed.
pub fn normalize_key(key: &str) -> String {
    key.trim().trim_matches('/').to_string()
}

fn strip_scheme(uri: &str) -> &str {
    for scheme in ["https://", "http://"] {
        if let Some(head) = uri.get(..scheme.len()) {
            if head.eq_ignore_ascii_case(scheme) {
                return &uri[scheme.len()..];
            }
        }
    }
    uri
}

fn slugify(segment: &str) -> String {
    let mut slug = String::with_capacity(segment.len());
    let mut last_dash = true;
    for c in segment.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    slug.truncate(SLUG_MAX);
    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(uri: &str) -> CodeReference {
        CodeReference::ContainerImage {
            uri: uri.to_string(),
        }
    }

    #[test]
    fn parse_keeps_registry_port_out_of_tag() {
        let parsed = parse_image("localhost:5000/team/app");
        assert_eq!(parsed.repository, "localhost:5000/team/app");
        assert_eq!(parsed.tag, None);

        let parsed = parse_image("localhost:5000/team/app:v3");
        assert_eq!(parsed.repository, "localhost:5000/team/app");
        assert_eq!(parsed.tag, Some("v3"));
    }

    #[test]
    fn parse_digest_reference() {
        let parsed = parse_image("repo/app@sha256:abcd");
        assert_eq!(parsed.repository, "repo/app");
        assert_eq!(parsed.tag, None);
        assert_eq!(parsed.digest, Some("sha256:abcd"));
    }

    #[test]
    fn floating_tags() {
        assert!(is_floating_tag("123.dkr.ecr.eu-west-1.amazonaws.com/app:latest"));
        assert!(is_floating_tag("repo/app"));
        assert!(!is_floating_tag("repo/app:v1"));
        assert!(!is_floating_tag("repo/app:latest-rc"));
        assert!(!is_floating_tag("repo/app@sha256:abcd"));
    }

    #[test]
    fn name_is_pure_function_of_identity() {
        let a = derive_function_name(&image("HTTPS://Repo/App:v1"));
        let b = derive_function_name(&image("repo/app:v2"));
        assert_eq!(a, b);
        assert!(a.0.starts_with("offload-app-"), "got {a}");
    }

    #[test]
    fn distinct_repositories_get_distinct_names() {
        let a = derive_function_name(&image("team-a/app:v1"));
        let b = derive_function_name(&image("team-b/app:v1"));
        assert_ne!(a, b);
    }

    #[test]
    fn name_fits_provider_limit() {
        let long = format!("repo/{}:v1", "x".repeat(200));
        let name = derive_function_name(&image(&long));
        assert!(name.0.len() <= 64, "len {}", name.0.len());
        assert!(name
            .0
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-'));
    }
}
