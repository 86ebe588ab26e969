//! Property-based tests for the rewrite pipeline.

use proptest::prelude::*;
use wharf_shared::{Environment, RewriteSettings, SiteConfig, StorageSettings};

use super::config::RewriteConfig;
use super::engine::RewriteEngine;
use crate::tenant::{CookieDomain, RequestContext, Tenant};

fn config(environment: Environment, bypass: &str) -> RewriteConfig {
    let site = SiteConfig {
        environment,
        home_url: "http://localhost".to_string(),
        proxy_port: Some(81),
        production_domain: "example.com".to_string(),
        subdomain_suffix: "-dev".to_string(),
        ..SiteConfig::default()
    };
    let storage = StorageSettings {
        endpoint: "https://store.example.com".to_string(),
        bucket: "assets".to_string(),
        ..StorageSettings::default()
    };
    let rewrite = RewriteSettings {
        bypass_urls: bypass.to_string(),
        log_rewrites: false,
    };
    RewriteConfig::from_settings(&site, &storage, &rewrite).expect("valid config")
}

fn context() -> RequestContext {
    RequestContext::new(
        Tenant::new(3, 1, "shop-dev.localhost:81", "/"),
        CookieDomain::new(),
    )
}

fn environment() -> impl Strategy<Value = Environment> {
    prop_oneof![
        Just(Environment::Development),
        Just(Environment::Staging),
        Just(Environment::Production),
    ]
}

/// URLs built from the hosts, ports and paths the site actually produces.
fn site_url() -> impl Strategy<Value = String> {
    let scheme = prop::sample::select(vec!["http", "https"]);
    let host = prop::sample::select(vec![
        "localhost",
        "shop.localhost",
        "shop-dev.localhost",
        "example.com",
        "www.example.com",
        "a.b.example.com",
        "other.org",
        "store.example.com",
        "127.0.0.1",
    ]);
    let port = prop::sample::select(vec!["", ":80", ":81", ":443", ":8080"]);
    let path = prop::sample::select(vec![
        "",
        "/",
        "/wp",
        "/wp/wp-admin/",
        "/blog/post",
        "/app/uploads/sites/3/2024/11/a.jpg",
        "/app/uploads/2024/a.png",
        "/wp/app/uploads/sites/3/b.jpg",
        "/wp-content/uploads/x.gif",
    ]);
    let query = prop::sample::select(vec!["", "?x=1", "?next=/wp/", "#frag"]);

    (scheme, host, port, path, query)
        .prop_map(|(s, h, p, path, q)| format!("{s}://{h}{p}{path}{q}"))
}

/// Strings that are not absolute HTTP URLs.
fn non_http_input() -> impl Strategy<Value = String> {
    prop_oneof![
        "/[a-z0-9/._-]{0,30}",
        "(mailto|tel|data|ftp|javascript):[a-z0-9/@.]{0,20}",
        "[a-z0-9 ._-]{0,20}",
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Rewriting an already rewritten URL changes nothing.
    #[test]
    fn prop_rewrite_is_idempotent(url in site_url(), env in environment()) {
        let config = config(env, "");
        let ctx = context();

        let once = RewriteEngine::new(&config, &ctx).rewrite_url(&url);
        let twice = RewriteEngine::new(&config, &ctx).rewrite_url(&once);

        prop_assert_eq!(&twice, &once, "input was {}", url);
    }

    /// A URL matching a bypass rule comes back byte-for-byte.
    #[test]
    fn prop_bypassed_url_is_unchanged(url in site_url(), env in environment()) {
        let config = config(env, &url);
        let ctx = context();

        prop_assert_eq!(RewriteEngine::new(&config, &ctx).rewrite_url(&url), url);
    }

    /// Relative paths, non-HTTP schemes and garbage pass through.
    #[test]
    fn prop_non_http_input_is_unchanged(input in non_http_input(), env in environment()) {
        let config = config(env, "");
        let ctx = context();

        prop_assert_eq!(RewriteEngine::new(&config, &ctx).rewrite_url(&input), input);
    }

    /// A second lookup of the same URL is served from the cache.
    #[test]
    fn prop_cache_returns_first_result(url in site_url()) {
        let config = config(Environment::Development, "");
        let ctx = context();
        let mut engine = RewriteEngine::new(&config, &ctx);

        let first = engine.rewrite_url(&url);
        let size = engine.cache().len();
        let second = engine.rewrite_url(&url);

        prop_assert_eq!(first, second);
        prop_assert_eq!(engine.cache().len(), size);
    }
}
