use f1_finish::resolver::{MatchTier, Resolution, ResolverOptions, resolve, resolve_with};

fn found(name: &str, tier: MatchTier) -> Resolution {
    Resolution::Found {
        name: name.to_string(),
        tier,
    }
}

#[test]
fn short_fragment_resolves_by_substring() {
    let choices = ["lewis_hamilton", "max_verstappen"];
    assert_eq!(
        resolve("ham", &choices),
        found("lewis_hamilton", MatchTier::Substring)
    );
}

#[test]
fn exact_match_beats_earlier_substring_match() {
    let choices = ["lewis_hamilton", "hamilton", "max_verstappen"];
    assert_eq!(resolve("hamilton", &choices), found("hamilton", MatchTier::Exact));
    assert_eq!(resolve("Hamilton ", &choices), found("hamilton", MatchTier::Exact));
}

#[test]
fn resolving_a_match_again_is_stable() {
    let choices = [
        "alonso",
        "lewis_hamilton",
        "max_verstappen",
        "michael_schumacher",
        "ralf_schumacher",
    ];
    for query in ["ham", "MAX", "schumacher", "alnso", "ralf"] {
        let first = resolve(query, &choices);
        let name = first.name().expect("query should resolve").to_string();
        assert_eq!(resolve(&name, &choices), found(&name, MatchTier::Exact));
    }
}

#[test]
fn ties_go_to_first_choice_in_order() {
    assert_eq!(
        resolve("verstappen", &["jos_verstappen", "max_verstappen"]).name(),
        Some("jos_verstappen")
    );
    assert_eq!(
        resolve("verstappen", &["max_verstappen", "jos_verstappen"]).name(),
        Some("max_verstappen")
    );
}

#[test]
fn approximate_match_picks_smallest_distance() {
    let choices = ["raikkonen", "rosberg", "button"];
    assert_eq!(
        resolve("raikonen", &choices),
        found("raikkonen", MatchTier::Approximate)
    );
}

#[test]
fn unknown_entity_returns_capped_suggestions() {
    let choices = (0..30)
        .map(|i| format!("driver_{i:02}"))
        .collect::<Vec<_>>();
    let res = resolve("nonexistent_driver_zzz", &choices);
    let Resolution::NotFound { suggestions } = res else {
        panic!("query should not resolve");
    };
    assert!(!suggestions.is_empty());
    assert!(suggestions.len() <= ResolverOptions::default().suggestion_limit);
    assert!(suggestions.iter().all(|s| choices.contains(s)));
}

#[test]
fn suggestion_limit_is_configurable() {
    let choices = ["monza", "monaco", "montreal", "silverstone"];
    let opts = ResolverOptions {
        suggestion_limit: 2,
        ..Default::default()
    };
    let Resolution::NotFound { suggestions } = resolve_with("zzzzzz", &choices, opts) else {
        panic!("query should not resolve");
    };
    assert_eq!(suggestions.len(), 2);
}

#[test]
fn empty_choices_never_match() {
    let choices: [&str; 0] = [];
    assert_eq!(
        resolve("hamilton", &choices),
        Resolution::NotFound {
            suggestions: Vec::new()
        }
    );
}
