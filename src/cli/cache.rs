use chrono::{DateTime, TimeDelta, Utc};

use crate::cache::{cache_ttl, Snapshot, SnapshotStore};
use crate::cli::open_store;
use crate::config::Config;
use crate::{die, CacheAction, CacheArgs};

/// Describes an age such as "3h 12m".
fn describe_age(age: TimeDelta) -> String {
    if age < TimeDelta::zero() {
        return "from the future".to_string();
    }

    let hours = age.num_hours();
    let minutes = age.num_minutes() % 60;

    match hours {
        0 => format!("{}m", minutes),
        _ => format!("{}h {}m", hours, minutes),
    }
}

fn describe_snapshot(snapshot: &Snapshot, now: DateTime<Utc>) -> String {
    let freshness = if snapshot.is_fresh_at(now, cache_ttl()) {
        "fresh"
    } else {
        "expired"
    };

    format!(
        "{} models cached at {} ({} old, {})",
        snapshot.models.len(),
        snapshot.timestamp.to_rfc3339(),
        describe_age(snapshot.age_at(now)),
        freshness
    )
}

pub(crate) fn cache_cmd(config: &Config, args: &CacheArgs) {
    let store = open_store(config);

    match args.action {
        CacheAction::Path => println!("{}", store.path().display()),
        CacheAction::Clear => {
            if let Err(err) = store.clear() {
                die!("{}", err);
            }

            log::info!("removed {}", store.path().display());
        }
        CacheAction::Show => match store.read() {
            Ok(Some(snapshot)) => println!("{}", describe_snapshot(&snapshot, Utc::now())),
            Ok(None) => println!("no models are cached"),
            Err(err) => die!("{}", err),
        },
    }
}
