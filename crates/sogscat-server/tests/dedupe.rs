//! Properties of the two de-duplication passes.

use proptest::prelude::*;
use sogscat_server::{PublicKey, RoomRecord, ServerCandidate, dedupe_by_data, dedupe_by_url};

fn pubkey(seed: u8) -> PublicKey {
    PublicKey::from_bytes([seed; 32])
}

fn scheme(secure: bool) -> &'static str {
    if secure { "https" } else { "http" }
}

/// Join-link candidates over a small pool of hosts, so that collisions are common.
fn join_candidates() -> impl Strategy<Value = Vec<ServerCandidate>> {
    prop::collection::vec((0u8..4, any::<bool>(), 0u8..3, 0u8..3), 0..12).prop_map(|links| {
        links
            .into_iter()
            .map(|(host, secure, token, key)| {
                let url = format!(
                    "{}://host{host}.example/room{token}?public_key={}",
                    scheme(secure),
                    pubkey(key)
                );
                ServerCandidate::from_join_url(&url).unwrap()
            })
            .collect()
    })
}

/// Resolved servers with distinct hosts; identities overlap through keys and rooms.
fn resolved_servers() -> impl Strategy<Value = Vec<ServerCandidate>> {
    prop::collection::vec((0u8..3, any::<bool>(), prop::collection::vec(0u8..4, 0..3)), 0..8)
        .prop_map(|servers| {
            servers
                .into_iter()
                .enumerate()
                .map(|(i, (key, secure, rooms))| {
                    let rooms = rooms
                        .into_iter()
                        .map(|room| RoomRecord::new(format!("room{room}")).created(f64::from(room)))
                        .collect();
                    let base = format!("{}://node{i}.example", scheme(secure));
                    ServerCandidate::resolved(&base, pubkey(key), rooms).unwrap()
                })
                .collect()
        })
}

fn summary(servers: &[ServerCandidate]) -> Vec<(String, Vec<String>, Vec<PublicKey>)> {
    let mut summary: Vec<_> = servers
        .iter()
        .map(|s| {
            let mut hints = s.room_hints().to_vec();
            hints.sort();
            let mut keys = s.pubkey_candidates().to_vec();
            keys.sort();
            (s.base_url(), hints, keys)
        })
        .collect();
    summary.sort();
    summary
}

proptest! {
    #[test]
    fn dedupe_by_url_leaves_unique_hostnames(servers in join_candidates()) {
        let deduped = dedupe_by_url(servers).unwrap();
        let mut hostnames: Vec<_> = deduped.iter().map(|s| s.hostname(true)).collect();
        let total = hostnames.len();
        hostnames.dedup();
        prop_assert_eq!(hostnames.len(), total);
    }

    #[test]
    fn dedupe_by_url_is_idempotent(servers in join_candidates()) {
        let once = dedupe_by_url(servers).unwrap();
        let twice = dedupe_by_url(once.clone()).unwrap();
        prop_assert_eq!(summary(&once), summary(&twice));
    }

    #[test]
    fn dedupe_by_url_ignores_input_order(servers in join_candidates()) {
        let mut reversed = servers.clone();
        reversed.reverse();
        prop_assert_eq!(
            summary(&dedupe_by_url(servers).unwrap()),
            summary(&dedupe_by_url(reversed).unwrap())
        );
    }

    #[test]
    fn dedupe_by_url_prefers_https(servers in join_candidates()) {
        let deduped = dedupe_by_url(servers.clone()).unwrap();
        for server in &deduped {
            let any_secure = servers
                .iter()
                .filter(|s| s.hostname(true) == server.hostname(true))
                .any(|s| s.base_url().starts_with("https://"));
            prop_assert_eq!(server.base_url().starts_with("https://"), any_secure);
        }
    }

    #[test]
    fn dedupe_by_data_keeps_every_identity(servers in resolved_servers()) {
        let before = servers.len();
        let mut keys: Vec<_> = servers.iter().filter_map(ServerCandidate::pubkey).collect();
        keys.sort();
        keys.dedup();

        let deduped = dedupe_by_data(servers).unwrap();
        let mut kept: Vec<_> = deduped.iter().filter_map(ServerCandidate::pubkey).collect();
        kept.sort();
        kept.dedup();

        prop_assert_eq!(kept, keys);
        prop_assert!(deduped.len() <= before);
    }
}

fn resolved(base: &str, key: u8, rooms: &[&str]) -> ServerCandidate {
    let rooms = rooms.iter().map(|token| RoomRecord::new(*token).created(1.0)).collect();
    ServerCandidate::resolved(base, pubkey(key), rooms).unwrap()
}

#[test]
fn test_identity_merge_only_compares_neighbours() {
    // `c` shares a room with `a` only; it is compared with `b` before `b` folds into `a`.
    let servers = vec![
        resolved("https://a.example", 1, &["one", "three"]),
        resolved("https://b.example", 1, &["one"]),
        resolved("https://c.example", 1, &["three"]),
    ];
    let once = dedupe_by_data(servers).unwrap();
    assert_eq!(once.len(), 2);

    let twice = dedupe_by_data(once).unwrap();
    assert_eq!(twice.len(), 1);
    assert_eq!(twice[0].base_url(), "https://a.example");
}

#[test]
fn test_identity_merge_keeps_first_room_list() {
    let servers = vec![
        resolved("https://a.example", 1, &["one"]),
        resolved("https://b.example", 1, &["one", "two"]),
    ];
    let merged = dedupe_by_data(servers).unwrap();
    assert_eq!(merged.len(), 1);
    let tokens: Vec<_> = merged[0].rooms().unwrap().iter().map(|r| r.token.as_str()).collect();
    assert_eq!(tokens, ["one"]);
}
