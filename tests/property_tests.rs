//! Property-based tests for settings precedence and the retry schedule.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated inputs.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use doctl::api::backoff::{jitter, RetryPolicy, INITIAL_DELAY, JITTER, MAX_DELAY};
use doctl::core::config::{
    settings::{global_settings, API_URL},
    Document, Provided, Resolver, SettingValue, Source,
};

fn resolver() -> Resolver {
    let mut specs = global_settings();
    for spec in &mut specs {
        spec.bind(&[]);
    }
    Resolver::new(specs)
}

/// Strategy for URL-ish setting values.
fn url_value() -> impl Strategy<Value = String> {
    "[a-z]{1,12}".prop_map(|host| format!("http://{}", host))
}

proptest! {
    /// The effective value is the highest-precedence source that is set.
    #[test]
    fn precedence_picks_highest_defined_source(
        flag in proptest::option::of(url_value()),
        env in proptest::option::of(url_value()),
        doc in proptest::option::of(url_value()),
    ) {
        let flags: BTreeMap<String, Provided<SettingValue>> = flag
            .clone()
            .map(|v| (API_URL.to_string(), Provided::Explicit(SettingValue::Str(v))))
            .into_iter()
            .collect();
        let env_map: HashMap<String, String> = env
            .clone()
            .map(|v| ("DIGITALOCEAN_API_URL".to_string(), v))
            .into_iter()
            .collect();
        let document = match &doc {
            Some(v) => Document::parse(&format!("api-url: {}\n", v), Path::new("c.yaml")).unwrap(),
            None => Document::default(),
        };

        let effective = resolver()
            .resolve_with_document(&flags, &env_map, document, PathBuf::from("c.yaml"))
            .unwrap();

        let (expected, source) = if let Some(v) = flag {
            (v, Source::Flag)
        } else if let Some(v) = env {
            (v, Source::Env)
        } else if let Some(v) = doc {
            (v, Source::Document)
        } else {
            (doctl::core::config::settings::DEFAULT_API_URL.to_string(), Source::Default)
        };
        prop_assert_eq!(effective.string(API_URL), Some(expected));
        prop_assert_eq!(effective.source(API_URL), Some(source));
    }

    /// The un-jittered schedule doubles from the initial delay up to the cap,
    /// with one entry per permitted retry.
    #[test]
    fn schedule_doubles_and_caps(retries in 0u32..20) {
        let schedule: Vec<Duration> = RetryPolicy::new(retries).schedule().collect();
        prop_assert_eq!(schedule.len(), retries as usize);
        for (i, delay) in schedule.iter().enumerate() {
            let doubled = INITIAL_DELAY.saturating_mul(1u32 << i.min(31));
            prop_assert_eq!(*delay, doubled.min(MAX_DELAY));
        }
    }

    /// Jitter stays within the configured band.
    #[test]
    fn jitter_stays_in_band(millis in 1u64..20_000, seed in any::<u64>()) {
        let delay = Duration::from_millis(millis);
        let mut rng = StdRng::seed_from_u64(seed);
        let jittered = jitter(delay, &mut rng).as_secs_f64();
        let base = delay.as_secs_f64();
        prop_assert!(jittered >= base * (1.0 - JITTER) - 1e-9);
        prop_assert!(jittered <= base * (1.0 + JITTER) + 1e-9);
    }
}
