/// Known bot-protection vendors and how they show up in a response.
struct Fingerprint {
    vendor: &'static str,
    /// (lowercase header name, lowercase substring of its value; empty matches any value)
    headers: &'static [(&'static str, &'static str)],
    body: &'static [&'static str],
}

const FINGERPRINTS: &[Fingerprint] = &[
    Fingerprint {
        vendor: "Cloudflare",
        headers: &[("cf-ray", ""), ("cf-mitigated", ""), ("server", "cloudflare")],
        body: &["just a moment...", "cf-browser-verification", "attention required! | cloudflare"],
    },
    Fingerprint {
        vendor: "Akamai",
        headers: &[("server", "akamaighost"), ("akamai-grn", "")],
        body: &["reference&#32;&#35;", "access denied</h1>"],
    },
    Fingerprint {
        vendor: "Imperva",
        headers: &[("x-iinfo", ""), ("x-cdn", "incapsula"), ("set-cookie", "incap_ses")],
        body: &["_incapsula_resource", "incapsula incident id"],
    },
    Fingerprint {
        vendor: "Sucuri",
        headers: &[("x-sucuri-id", ""), ("server", "sucuri")],
        body: &["sucuri website firewall"],
    },
    Fingerprint {
        vendor: "AWS WAF",
        headers: &[("x-amzn-waf-action", "")],
        body: &["awswafintegration", "aws-waf-token"],
    },
    Fingerprint {
        vendor: "DDoS-Guard",
        headers: &[("server", "ddos-guard")],
        body: &["ddos-guard"],
    },
];

/// Vendor whose fingerprint matches the given headers or body, if any.
///
/// Header names are expected in lowercase.
pub fn detect(headers: &[(String, String)], body: Option<&str>) -> Option<&'static str> {
    for fp in FINGERPRINTS {
        let header_hit = fp.headers.iter().any(|(name, needle)| {
            headers.iter().any(|(h, v)| {
                h == name && (needle.is_empty() || v.to_lowercase().contains(needle))
            })
        });
        if header_hit {
            return Some(fp.vendor);
        }
    }

    let body = body?.to_lowercase();
    FINGERPRINTS
        .iter()
        .find(|fp| fp.body.iter().any(|needle| body.contains(needle)))
        .map(|fp| fp.vendor)
}

/// Statuses a challenge page is usually served with.
pub fn is_challenge_status(status: u16) -> bool {
    matches!(status, 403 | 429 | 503)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(name: &str, value: &str) -> (String, String) {
        (name.to_string(), value.to_string())
    }

    #[test]
    fn detects_cloudflare_from_headers() {
        let headers = vec![h("server", "cloudflare"), h("content-type", "text/html")];
        assert_eq!(detect(&headers, None), Some("Cloudflare"));
        assert_eq!(detect(&[h("cf-ray", "8a1b2c-AMS")], None), Some("Cloudflare"));
    }

    #[test]
    fn detects_vendor_from_body() {
        let body = "<html><title>Just a moment...</title></html>";
        assert_eq!(detect(&[], Some(body)), Some("Cloudflare"));
        assert_eq!(
            detect(&[h("server", "nginx")], Some("Request unsuccessful. Incapsula incident ID: 1")),
            Some("Imperva")
        );
    }

    #[test]
    fn plain_server_is_not_flagged() {
        assert_eq!(detect(&[h("server", "nginx")], Some("<h1>Forbidden</h1>")), None);
    }
}
