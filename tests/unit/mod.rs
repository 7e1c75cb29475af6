/// Unit tests over the public building blocks
use pushforward::*;

mod assistant;
mod drafts;
mod progression;
mod storage;

fn key(s: &str) -> DateKey {
    DateKey::parse(s).expect("valid date key")
}
