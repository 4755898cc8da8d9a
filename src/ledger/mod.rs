//! Engagement ledger.
//!
//! Pure state transitions for likes and dislikes. Given the current engagement of
//! a post and a reaction, computes the post's next engagement and the signed change
//! to charge against the author's aggregate. Persisting both halves is the
//! repository's job; nothing here touches the store.
//!
//! Reactions toggle: reacting twice with the same kind cancels the first one. A
//! user is in at most one of `liked_by` and `disliked_by` after any reaction, even
//! when the stored state had them in both. Counters never drop below zero.

use serde::{Deserialize, Serialize};

use crate::models::Blog;

/// Kind of reaction a user can leave on a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Dislike,
}

impl ReactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionKind::Like => "like",
            ReactionKind::Dislike => "dislike",
        }
    }
}

/// The engagement fields of a post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Engagement {
    pub liked_by: Vec<String>,
    pub disliked_by: Vec<String>,
    pub likes: i64,
    pub dislikes: i64,
}

impl Engagement {
    pub fn has_liked(&self, user: &str) -> bool {
        self.liked_by.iter().any(|u| u == user)
    }

    pub fn has_disliked(&self, user: &str) -> bool {
        self.disliked_by.iter().any(|u| u == user)
    }
}

/// Signed change to an author's like/dislike totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateDelta {
    pub likes: i64,
    pub dislikes: i64,
}

impl AggregateDelta {
    pub fn is_zero(&self) -> bool {
        self.likes == 0 && self.dislikes == 0
    }

    /// Apply to a pair of totals, flooring each at zero.
    pub fn apply(&self, total_likes: i64, total_dislikes: i64) -> (i64, i64) {
        (
            floored(total_likes, self.likes),
            floored(total_dislikes, self.dislikes),
        )
    }
}

/// What a reaction did to the reactor's membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionEffect {
    /// Joined the set of the reaction kind
    Added,
    /// Left the set of the reaction kind (toggle off)
    Removed,
    /// Joined the set of the reaction kind and left the opposite one
    Switched,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionOutcome {
    pub engagement: Engagement,
    pub delta: AggregateDelta,
    pub effect: ReactionEffect,
}

/// `total + delta`, never below zero.
pub fn floored(total: i64, delta: i64) -> i64 {
    total.saturating_add(delta).max(0)
}

fn remove_member(set: &mut Vec<String>, user: &str) -> bool {
    let before = set.len();
    set.retain(|u| u != user);
    set.len() != before
}

/// Compute the effect of `reactor` reacting with `kind` on a post.
pub fn apply_reaction(current: &Engagement, reactor: &str, kind: ReactionKind) -> ReactionOutcome {
    let mut next = current.clone();
    let mut delta = AggregateDelta::default();

    let (same_set, same_count, other_set, other_count) = match kind {
        ReactionKind::Like => (
            &mut next.liked_by,
            &mut next.likes,
            &mut next.disliked_by,
            &mut next.dislikes,
        ),
        ReactionKind::Dislike => (
            &mut next.disliked_by,
            &mut next.dislikes,
            &mut next.liked_by,
            &mut next.likes,
        ),
    };
    let (same_delta, other_delta) = match kind {
        ReactionKind::Like => (&mut delta.likes, &mut delta.dislikes),
        ReactionKind::Dislike => (&mut delta.dislikes, &mut delta.likes),
    };

    let effect = if remove_member(same_set, reactor) {
        *same_count = floored(*same_count, -1);
        *same_delta = -1;
        ReactionEffect::Removed
    } else {
        same_set.push(reactor.to_string());
        *same_count = floored(*same_count, 1);
        *same_delta = 1;

        if remove_member(other_set, reactor) {
            *other_count = floored(*other_count, -1);
            *other_delta = -1;
            ReactionEffect::Switched
        } else {
            ReactionEffect::Added
        }
    };

    ReactionOutcome {
        engagement: next,
        delta,
        effect,
    }
}

/// Change to charge against the author aggregate when `blog` is deleted.
pub fn deletion_delta(blog: &Blog) -> AggregateDelta {
    AggregateDelta {
        likes: -blog.likes.max(0),
        dislikes: -blog.dislikes.max(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn users(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_like_then_unlike() {
        let start = Engagement::default();

        let liked = apply_reaction(&start, "u1", ReactionKind::Like);
        assert_eq!(liked.effect, ReactionEffect::Added);
        assert_eq!(liked.engagement.liked_by, users(&["u1"]));
        assert_eq!(liked.engagement.likes, 1);
        assert_eq!(liked.delta, AggregateDelta { likes: 1, dislikes: 0 });

        let unliked = apply_reaction(&liked.engagement, "u1", ReactionKind::Like);
        assert_eq!(unliked.effect, ReactionEffect::Removed);
        assert_eq!(unliked.engagement, start);
        assert_eq!(unliked.delta, AggregateDelta { likes: -1, dislikes: 0 });
    }

    #[test]
    fn test_dislike_switches_from_like() {
        let start = Engagement {
            liked_by: users(&["u1"]),
            likes: 1,
            ..Default::default()
        };

        let outcome = apply_reaction(&start, "u1", ReactionKind::Dislike);
        assert_eq!(outcome.effect, ReactionEffect::Switched);
        assert!(outcome.engagement.liked_by.is_empty());
        assert_eq!(outcome.engagement.disliked_by, users(&["u1"]));
        assert_eq!(outcome.engagement.likes, 0);
        assert_eq!(outcome.engagement.dislikes, 1);
        assert_eq!(outcome.delta, AggregateDelta { likes: -1, dislikes: 1 });
    }

    #[test]
    fn test_unlike_with_zero_counter_stays_at_zero() {
        let start = Engagement {
            liked_by: users(&["u1"]),
            likes: 0,
            ..Default::default()
        };

        let outcome = apply_reaction(&start, "u1", ReactionKind::Like);
        assert_eq!(outcome.engagement.likes, 0);
        assert_eq!(AggregateDelta { likes: -1, dislikes: 0 }.apply(0, 0), (0, 0));
        assert_eq!(outcome.delta.apply(0, 0), (0, 0));
    }

    #[test]
    fn test_corrupted_membership_converges() {
        let start = Engagement {
            liked_by: users(&["u1", "u1"]),
            disliked_by: users(&["u1"]),
            likes: 2,
            dislikes: 1,
        };

        let like = apply_reaction(&start, "u1", ReactionKind::Like);
        assert!(!(like.engagement.has_liked("u1") && like.engagement.has_disliked("u1")));

        let dislike = apply_reaction(&start, "u1", ReactionKind::Dislike);
        assert!(!(dislike.engagement.has_liked("u1") && dislike.engagement.has_disliked("u1")));
    }

    #[test]
    fn test_other_users_untouched() {
        let start = Engagement {
            liked_by: users(&["a", "b"]),
            disliked_by: users(&["c"]),
            likes: 2,
            dislikes: 1,
        };

        let outcome = apply_reaction(&start, "c", ReactionKind::Like);
        assert_eq!(outcome.engagement.liked_by, users(&["a", "b", "c"]));
        assert!(outcome.engagement.disliked_by.is_empty());
        assert_eq!(outcome.engagement.likes, 3);
        assert_eq!(outcome.engagement.dislikes, 0);
    }

    #[test]
    fn test_deletion_delta() {
        let blog = Blog {
            id: "p".into(),
            title: "t".into(),
            description: "d".into(),
            username: "a".into(),
            email: "a@example.com".into(),
            user_id: None,
            tags: vec![],
            liked_by: vec![],
            disliked_by: vec![],
            likes: 3,
            dislikes: 1,
            views: 0,
            comments: vec![],
            created_at_millis: 0,
            version: 1,
        };

        let delta = deletion_delta(&blog);
        assert_eq!(delta.apply(10, 4), (7, 3));
        assert_eq!(delta.apply(1, 0), (0, 0));
    }

    fn reaction_strategy() -> impl Strategy<Value = (usize, ReactionKind)> {
        (
            0usize..4,
            prop_oneof![Just(ReactionKind::Like), Just(ReactionKind::Dislike)],
        )
    }

    proptest! {
        #[test]
        fn prop_invariants_hold_for_any_sequence(ops in prop::collection::vec(reaction_strategy(), 0..64)) {
            let names = ["u0", "u1", "u2", "u3"];
            let mut state = Engagement::default();
            let (mut total_likes, mut total_dislikes) = (0i64, 0i64);

            for (user, kind) in ops {
                let outcome = apply_reaction(&state, names[user], kind);
                let (l, d) = outcome.delta.apply(total_likes, total_dislikes);
                total_likes = l;
                total_dislikes = d;
                state = outcome.engagement;

                prop_assert!(state.likes >= 0 && state.dislikes >= 0);
                prop_assert!(total_likes >= 0 && total_dislikes >= 0);
                for name in names {
                    prop_assert!(!(state.has_liked(name) && state.has_disliked(name)));
                }
                prop_assert_eq!(state.likes, state.liked_by.len() as i64);
                prop_assert_eq!(state.dislikes, state.disliked_by.len() as i64);
                prop_assert_eq!(total_likes, state.likes);
                prop_assert_eq!(total_dislikes, state.dislikes);
            }
        }

        #[test]
        fn prop_same_reaction_twice_restores_membership(
            ops in prop::collection::vec(reaction_strategy(), 0..32),
            user in 0usize..4,
        ) {
            let names = ["u0", "u1", "u2", "u3"];
            let mut state = Engagement::default();
            for (u, kind) in ops {
                state = apply_reaction(&state, names[u], kind).engagement;
            }

            // Toggling is only an identity from a state where the user has no reaction.
            let mut cleared = state.clone();
            if cleared.has_liked(names[user]) {
                cleared = apply_reaction(&cleared, names[user], ReactionKind::Like).engagement;
            }
            if cleared.has_disliked(names[user]) {
                cleared = apply_reaction(&cleared, names[user], ReactionKind::Dislike).engagement;
            }

            let once = apply_reaction(&cleared, names[user], ReactionKind::Like);
            let twice = apply_reaction(&once.engagement, names[user], ReactionKind::Like);
            prop_assert_eq!(twice.engagement.liked_by.len(), cleared.liked_by.len());
            prop_assert_eq!(twice.engagement.likes, cleared.likes);
            prop_assert!(!twice.engagement.has_liked(names[user]));
        }
    }
}
