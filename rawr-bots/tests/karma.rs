//! Karma scoring against random vote sequences.

use rand::Rng;
use rawrbot::karma::Karma;
use rawrbot::kv::KvStore;

fn make_karma() -> Karma {
    Karma::new(KvStore::in_memory("karma").unwrap()).unwrap()
}

#[test]
fn score_is_the_sum_of_votes() {
    let karma = make_karma();
    let mut rng = rand::thread_rng();
    let mut expected = 0i64;
    for _ in 0..500 {
        if rng.gen_bool(0.5) {
            karma.increment("foo").unwrap();
            expected += 1;
        } else {
            karma.decrement("foo").unwrap();
            expected -= 1;
        }
        assert_eq!(karma.score("foo").unwrap(), expected);
        // Neutral is never stored.
        assert_eq!(karma.store().get("foo").unwrap().is_none(), expected == 0);
    }
}

#[test]
fn votes_in_one_line_all_apply() {
    let karma = make_karma();
    for vote in karma.votes("foo++ foo++ (foo)-- bar--") {
        karma.adjust(&vote.key, vote.delta).unwrap();
    }
    assert_eq!(karma.score("foo").unwrap(), 1);
    assert_eq!(karma.score("bar").unwrap(), -1);
}

#[test]
fn display_for_negative_and_untouched() {
    let karma = make_karma();
    karma.decrement("Mondays").unwrap();
    karma.decrement("mondays").unwrap();
    assert_eq!(karma.display("mondays").unwrap(), "mondays has karma of -2.");
    assert_eq!(karma.display("tuesdays").unwrap(), "tuesdays has neutral karma.");
}
