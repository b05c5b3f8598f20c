use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, thiserror::Error)]
pub enum RatingError {
    #[error("got {ids} laptop IDs but {scores} scores")]
    LengthMismatch { ids: usize, scores: usize },
    #[error("score for laptop {0} is not a finite number")]
    InvalidScore(String),
    #[error("rating store lock is poisoned")]
    Poisoned,
}

/// Running totals for one laptop. The average is always derived, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rating {
    pub count: u32,
    pub sum: f64,
}

impl Rating {
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / f64::from(self.count)
        }
    }
}

/// State of one laptop's rating right after an `add`
#[derive(Debug, Clone, PartialEq)]
pub struct RatingResult {
    pub laptop_id: String,
    pub count: u32,
    pub average: f64,
}

pub trait RatingStore: Send + Sync {
    /// Adds `scores[i]` to the rating of `ids[i]`. A malformed request is
    /// rejected before any rating changes.
    fn add(&self, ids: &[String], scores: &[f64]) -> Result<Vec<RatingResult>, RatingError>;

    fn get(&self, id: &str) -> Result<Option<Rating>, RatingError>;
}

#[derive(Debug, Default)]
pub struct InMemoryRatingStore {
    data: RwLock<HashMap<String, Rating>>,
}

impl InMemoryRatingStore {
    pub fn new() -> InMemoryRatingStore {
        InMemoryRatingStore::default()
    }
}

impl RatingStore for InMemoryRatingStore {
    fn add(&self, ids: &[String], scores: &[f64]) -> Result<Vec<RatingResult>, RatingError> {
        if ids.len() != scores.len() {
            return Err(RatingError::LengthMismatch {
                ids: ids.len(),
                scores: scores.len(),
            });
        }
        if let Some((id, _)) = ids.iter().zip(scores).find(|(_, score)| !score.is_finite()) {
            return Err(RatingError::InvalidScore(id.clone()));
        }

        let mut data = self.data.write().map_err(|_| RatingError::Poisoned)?;
        Ok(ids
            .iter()
            .zip(scores)
            .map(|(id, score)| {
                let rating = data.entry(id.clone()).or_default();
                rating.count += 1;
                rating.sum += score;
                RatingResult {
                    laptop_id: id.clone(),
                    count: rating.count,
                    average: rating.average(),
                }
            })
            .collect())
    }

    fn get(&self, id: &str) -> Result<Option<Rating>, RatingError> {
        let data = self.data.read().map_err(|_| RatingError::Poisoned)?;
        Ok(data.get(id).copied())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn two_scores_average() {
        let store = InMemoryRatingStore::new();
        let id = vec!["laptop-1".to_string()];
        store.add(&id, &[4.0]).unwrap();
        let results = store.add(&id, &[2.0]).unwrap();

        assert_eq!(
            results,
            vec![RatingResult {
                laptop_id: "laptop-1".to_string(),
                count: 2,
                average: 3.0,
            }]
        );
    }

    #[test]
    fn repeated_id_in_one_batch_counts_twice() {
        let store = InMemoryRatingStore::new();
        let ids = vec!["a".to_string(), "b".to_string(), "a".to_string()];
        let results = store.add(&ids, &[10.0, 5.0, 6.0]).unwrap();

        assert_eq!(results[2].count, 2);
        assert_eq!(results[2].average, 8.0);
        assert_eq!(store.get("b").unwrap(), Some(Rating { count: 1, sum: 5.0 }));
    }

    #[test]
    fn mismatched_lengths_change_nothing() {
        let store = InMemoryRatingStore::new();
        let ids = vec!["a".to_string(), "b".to_string()];
        let err = store.add(&ids, &[1.0]).unwrap_err();

        assert!(matches!(err, RatingError::LengthMismatch { ids: 2, scores: 1 }));
        assert_eq!(store.get("a").unwrap(), None);
    }

    #[test]
    fn non_finite_score_changes_nothing() {
        let store = InMemoryRatingStore::new();
        let ids = vec!["a".to_string(), "b".to_string()];
        let err = store.add(&ids, &[3.0, f64::NAN]).unwrap_err();

        assert!(matches!(err, RatingError::InvalidScore(ref id) if id == "b"));
        assert_eq!(store.get("a").unwrap(), None);
    }

    #[test]
    fn concurrent_adds_are_not_lost() {
        let store = Arc::new(InMemoryRatingStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        store.add(&["shared".to_string()], &[1.0]).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let rating = store.get("shared").unwrap().unwrap();
        assert_eq!(rating.count, 800);
        assert_eq!(rating.average(), 1.0);
    }
}
