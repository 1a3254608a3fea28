//! Integration tests for ani-tui.
//!
//! These tests exercise the data layer end to end: quality filtering
//! against server maps, episode number matching, menu navigation across
//! realistic lists, history persistence, and link extraction.

use ani_tui::api::{build_storage_url, extract_direct_link};
use ani_tui::app::{bridge_pick, search_step, SearchStep};
use ani_tui::config::Config;
use ani_tui::history::WatchHistory;
use ani_tui::menu::SelectionMenu;
use ani_tui::types::{AnimeResult, Episode, EpisodeServers, available_qualities};
use std::collections::HashMap;

fn servers(pairs: &[(&str, &str)]) -> EpisodeServers {
    let raw: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    EpisodeServers::from_map(raw)
}

/// An episode carrying only a subset of quality tiers yields exactly
/// those options, still in ascending order.
#[test]
fn test_partial_quality_ladder() {
    let servers = servers(&[("FRLowQ", "id480"), ("FRFhdQ", "id1080")]);
    let qualities = available_qualities(&servers);

    assert_eq!(qualities.len(), 2);
    assert_eq!(qualities[0].server_key, "FRLowQ");
    assert_eq!(qualities[1].server_key, "FRFhdQ");
}

/// Unknown server keys never produce quality options.
#[test]
fn test_unknown_server_keys_ignored() {
    let servers = servers(&[("SomeOtherServer", "x"), ("FRLink", "id720")]);
    let qualities = available_qualities(&servers);

    assert_eq!(qualities.len(), 1);
    assert_eq!(qualities[0].server_key, "FRLink");
}

/// A full walk of the watch path at the data level: pick an episode from
/// a list, look up its servers, and resolve the storage id to a page URL.
#[test]
fn test_watch_path_data_flow() {
    let episodes: Vec<Episode> = ["1", "2", "13.5", "14"]
        .iter()
        .enumerate()
        .map(|(i, raw)| Episode::new(raw, "Episode", i))
        .collect();
    let numbers: Vec<f64> = episodes.iter().map(|e| e.display.value()).collect();

    let mut menu = SelectionMenu::new(episodes.len(), 10);
    assert!(menu.jump_to_number(13.5, &numbers));
    let picked = &episodes[menu.selected()];
    assert_eq!(picked.raw_number, "13.5");

    let servers = servers(&[("FRLink", "abc123/ep13-5")]);
    let qualities = available_qualities(&servers);
    assert_eq!(qualities.len(), 1);

    let id = servers.get(qualities[0].server_key).unwrap();
    assert_eq!(
        build_storage_url(id),
        "https://www.mediafire.com/file/abc123/ep13-5"
    );
}

/// Jump targets typed with a trailing `.0` land on integer episodes.
#[test]
fn test_jump_matches_integer_by_value() {
    let episodes: Vec<Episode> = (1..=20usize)
        .map(|n| Episode::new(&n.to_string(), "", n - 1))
        .collect();
    let numbers: Vec<f64> = episodes.iter().map(|e| e.display.value()).collect();

    let mut menu = SelectionMenu::new(episodes.len(), 5);
    assert!(menu.jump_to_number("7.0".parse().unwrap(), &numbers));
    assert_eq!(menu.selected(), 6);
    // The selected row stays inside the visible window after the jump.
    assert!(menu.window().contains(&menu.selected()));
}

/// History written through one store is visible from a fresh load, and
/// its episode string matches the display numbers the list produces.
#[test]
fn test_history_resume_round_trip() {
    let path = std::env::temp_dir().join(format!("ani-tui-it-history-{}.json", std::process::id()));
    let _ = std::fs::remove_file(&path);

    let mut history = WatchHistory::new(path.clone());
    let episode = Episode::new("13.5", "OVA", 0);
    history
        .mark_watched("anime-42", &episode.display.to_string(), "Test Show")
        .unwrap();

    let reloaded = WatchHistory::load(path.clone());
    let last = reloaded.get_last_watched("anime-42").unwrap();
    assert_eq!(last, "13.5");

    // The stored string parses back into a resume target that matches.
    let target: f64 = last.parse().unwrap();
    assert!(episode.display.matches(target));

    let _ = std::fs::remove_file(&path);
}

/// Feed records carry no catalog id until they are bridged.
#[test]
fn test_unresolved_record_bridging_state() {
    let mut record = AnimeResult::placeholder("Seasonal Show");
    assert!(record.is_unresolved());

    // Bridging replaces the record with a catalog hit.
    record.id = "777".to_string();
    assert!(!record.is_unresolved());
}

/// A search with zero hits stays on the prompt, and the next search with
/// hits proceeds normally.
#[test]
fn test_empty_search_returns_to_prompt() {
    assert_eq!(search_step(Vec::new()), SearchStep::NoResults);

    let retry = vec![
        AnimeResult::placeholder("Frieren"),
        AnimeResult::placeholder("Monster"),
    ];
    match search_step(retry.clone()) {
        SearchStep::Browse(results) => assert_eq!(results, retry),
        SearchStep::NoResults => panic!("non-empty results should open the list"),
    }
}

/// Bridging an unresolved record that has no catalog match yields nothing
/// and leaves the original result list intact.
#[test]
fn test_bridge_with_no_catalog_match_keeps_results() {
    let results = vec![
        AnimeResult::placeholder("Seasonal Show"),
        AnimeResult::placeholder("Other Show"),
    ];
    let picked = results[0].clone();
    assert!(picked.is_unresolved());

    // The catalog has nothing under that title.
    assert_eq!(bridge_pick(Vec::new()), None);

    // Zero matches must not disturb the list or the picked record.
    assert_eq!(results[0], picked);
    assert!(results[0].is_unresolved());
    assert_eq!(results.len(), 2);

    // When the catalog does answer, the first hit wins.
    let mut hit = AnimeResult::placeholder("Seasonal Show");
    hit.id = "777".to_string();
    let mut runner_up = AnimeResult::placeholder("Seasonal Show");
    runner_up.id = "778".to_string();
    let bridged = bridge_pick(vec![hit.clone(), runner_up]);
    assert_eq!(bridged, Some(hit));
}

/// Direct-link extraction against a realistic landing page snippet.
#[test]
fn test_direct_link_from_landing_page() {
    let html = r#"
        <html><body>
        <div class="dl-btn-cont">
          <a class="input popsok"
             href="https://download2261.mediafire.com/xyz/Episode+3.mp4"
             id="downloadButton">Download (245MB)</a>
        </div>
        </body></html>
    "#;
    assert_eq!(
        extract_direct_link(html).as_deref(),
        Some("https://download2261.mediafire.com/xyz/Episode+3.mp4")
    );
}

/// Menu navigation invariants hold across a long mixed key sequence.
#[test]
fn test_menu_invariants_over_sequence() {
    let mut menu = SelectionMenu::new(100, 12);
    let numbers: Vec<f64> = (1..=100).map(|n| n as f64).collect();

    for step in 0..500 {
        match step % 5 {
            0 | 1 => {
                menu.move_down();
            }
            2 => {
                menu.move_up();
            }
            3 => {
                menu.jump_to_number(((step * 7) % 100 + 1) as f64, &numbers);
            }
            _ => {
                menu.set_visible_rows(5 + step % 10);
            }
        }
        assert!(menu.selected() < menu.len());
        assert!(menu.window().contains(&menu.selected()));
    }
}

/// Config round-trips through TOML with the theme section intact.
#[test]
fn test_config_toml_round_trip() {
    let mut config = Config::new();
    config.player = Some("mpv".to_string());
    config.download_dir = "/media/anime".to_string();
    config.theme.accent = "blue".to_string();

    let serialized = toml::to_string_pretty(&config).unwrap();
    let parsed: Config = toml::from_str(&serialized).unwrap();

    assert_eq!(parsed.player.as_deref(), Some("mpv"));
    assert_eq!(parsed.download_dir, "/media/anime");
    assert_eq!(parsed.theme.accent, "blue");
}
