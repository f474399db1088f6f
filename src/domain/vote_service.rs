//! Voting service enforcing the single-vote-per-category invariant.
//!
//! ## Invariant
//! After any successful call, a user holds zero or one vote per category.
//! The public/private check happens only at cast time: a list made private
//! after receiving votes keeps them. That is a design choice, not a gap.

use std::sync::Arc;

use tracing::error;

use super::ApiResult;
use super::error::{Error, ErrorCode};
use super::list::{List, ListId};
use super::ports::{ListRepository, VotePersistenceError, VoteStore};
use super::user::UserId;
use super::vote::{VoteDetail, VoteOutcome};

/// One retry after a lost uniqueness race; the second read observes the
/// winner's vote, so a third attempt can never be needed for correctness.
const CAST_ATTEMPTS: u8 = 2;

/// Voting service over the list repository and vote store.
#[derive(Clone)]
pub struct VoteService {
    lists: Arc<dyn ListRepository>,
    votes: Arc<dyn VoteStore>,
}

fn map_vote_error(error: VotePersistenceError) -> Error {
    match error {
        VotePersistenceError::Connection { message } => {
            error!(%message, "vote store unavailable");
            Error::service_unavailable(message)
        }
        VotePersistenceError::Query { message } => {
            error!(%message, "vote store query failed");
            Error::internal(message)
        }
        VotePersistenceError::Conflict => {
            error!("vote uniqueness conflict persisted after retry");
            Error::internal("vote conflict")
        }
    }
}

fn map_list_error(error: super::ports::ListPersistenceError) -> Error {
    use super::ports::ListPersistenceError;
    match error {
        ListPersistenceError::Connection { message } => {
            error!(%message, "list repository unavailable");
            Error::service_unavailable(message)
        }
        ListPersistenceError::Query { message } => {
            error!(%message, "list repository query failed");
            Error::internal(message)
        }
        ListPersistenceError::SlugConflict => {
            error!("unexpected slug conflict during vote");
            Error::internal("list conflict")
        }
    }
}

impl VoteService {
    /// Create a new service over the given repositories.
    pub fn new(lists: Arc<dyn ListRepository>, votes: Arc<dyn VoteStore>) -> Self {
        Self { lists, votes }
    }

    /// Cast a vote for a list, switching any existing vote in the same
    /// category.
    ///
    /// The switch (delete old + insert new) is a single transaction inside
    /// the store; concurrent casts for the same (user, category) are
    /// serialised by the store's unique key on that pair. Losing the race
    /// surfaces as a conflict, after which one re-read settles the outcome.
    pub async fn cast_vote(&self, user_id: &UserId, list_id: &ListId) -> ApiResult<VoteOutcome> {
        for attempt in 0..CAST_ATTEMPTS {
            let list = self.load_votable_list(list_id).await?;

            let existing = self
                .votes
                .find_for_user_in_category(user_id, &list.category_id)
                .await
                .map_err(map_vote_error)?;

            let result = match existing {
                None => {
                    match self
                        .votes
                        .insert(user_id, list_id, &list.category_id)
                        .await
                    {
                        Ok(_) => Ok(VoteOutcome::Created),
                        Err(err) => Err(err),
                    }
                }
                Some(current) if current.vote.list_id == *list_id => {
                    return Err(Error::new(
                        ErrorCode::AlreadyVoted,
                        "You already voted for this list",
                    ));
                }
                Some(current) => {
                    match self
                        .votes
                        .replace(&current.vote.id, user_id, list_id, &list.category_id)
                        .await
                    {
                        Ok(_) => Ok(VoteOutcome::Switched {
                            from_title: current.list_title,
                            to_title: list.title,
                        }),
                        Err(err) => Err(err),
                    }
                }
            };

            match result {
                Ok(outcome) => return Ok(outcome),
                Err(VotePersistenceError::Conflict) if attempt + 1 < CAST_ATTEMPTS => {
                    // Lost a concurrent race; re-read and settle.
                    continue;
                }
                Err(err) => return Err(map_vote_error(err)),
            }
        }
        Err(Error::internal("vote conflict"))
    }

    /// Remove the caller's vote for a specific list.
    pub async fn remove_vote(&self, user_id: &UserId, list_id: &ListId) -> ApiResult<()> {
        let Some(vote) = self
            .votes
            .find_by_user_and_list(user_id, list_id)
            .await
            .map_err(map_vote_error)?
        else {
            return Err(Error::not_found("Vote not found"));
        };
        self.votes.delete(&vote.id).await.map_err(map_vote_error)
    }

    /// All votes by a user, with list and category context.
    pub async fn list_votes_for_user(&self, user_id: &UserId) -> ApiResult<Vec<VoteDetail>> {
        self.votes
            .list_for_user(user_id)
            .await
            .map_err(map_vote_error)
    }

    async fn load_votable_list(&self, list_id: &ListId) -> ApiResult<List> {
        let Some(list) = self
            .lists
            .find_by_id(list_id)
            .await
            .map_err(map_list_error)?
        else {
            return Err(Error::not_found("List not found"));
        };
        if !list.is_public {
            return Err(Error::new(
                ErrorCode::ListNotPublic,
                "Cannot vote on private lists",
            ));
        }
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for cast/switch/remove over stub stores.
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::domain::catalogue::CategoryId;
    use crate::domain::list::{BrowseFilter, ListChanges, ListDetail, ListSummary, NewList, Page};
    use crate::domain::ports::ListPersistenceError;
    use crate::domain::vote::{Vote, VoteId, VoteWithList};

    struct StubLists {
        lists: Vec<List>,
    }

    #[async_trait]
    impl ListRepository for StubLists {
        async fn find_by_id(&self, id: &ListId) -> Result<Option<List>, ListPersistenceError> {
            Ok(self.lists.iter().find(|l| &l.id == id).cloned())
        }

        async fn find_detail(
            &self,
            _key: &str,
        ) -> Result<Option<ListDetail>, ListPersistenceError> {
            unimplemented!("not exercised by vote service tests")
        }

        async fn create(&self, _new_list: NewList) -> Result<ListDetail, ListPersistenceError> {
            unimplemented!("not exercised by vote service tests")
        }

        async fn update(
            &self,
            _id: &ListId,
            _changes: ListChanges,
        ) -> Result<ListDetail, ListPersistenceError> {
            unimplemented!("not exercised by vote service tests")
        }

        async fn delete(&self, _id: &ListId) -> Result<(), ListPersistenceError> {
            unimplemented!("not exercised by vote service tests")
        }

        async fn browse(
            &self,
            _filter: &BrowseFilter,
        ) -> Result<Page<ListSummary>, ListPersistenceError> {
            unimplemented!("not exercised by vote service tests")
        }
    }

    #[derive(Default)]
    struct StubVoteState {
        votes: Vec<(Vote, String)>,
        /// Queue of forced conflicts for the next mutating calls.
        conflicts: u8,
    }

    #[derive(Default)]
    struct StubVotes {
        state: Mutex<StubVoteState>,
        titles: Vec<(ListId, String)>,
    }

    impl StubVotes {
        fn title_of(&self, list_id: &ListId) -> String {
            self.titles
                .iter()
                .find(|(id, _)| id == list_id)
                .map(|(_, t)| t.clone())
                .unwrap_or_default()
        }

        fn vote_rows(&self) -> Vec<Vote> {
            self.state
                .lock()
                .expect("state lock")
                .votes
                .iter()
                .map(|(v, _)| v.clone())
                .collect()
        }
    }

    #[async_trait]
    impl VoteStore for StubVotes {
        async fn find_for_user_in_category(
            &self,
            user_id: &UserId,
            category_id: &CategoryId,
        ) -> Result<Option<VoteWithList>, VotePersistenceError> {
            let state = self.state.lock().expect("state lock");
            Ok(state
                .votes
                .iter()
                .find(|(v, _)| &v.user_id == user_id && &v.category_id == category_id)
                .map(|(v, title)| VoteWithList {
                    vote: v.clone(),
                    list_title: title.clone(),
                }))
        }

        async fn find_by_user_and_list(
            &self,
            user_id: &UserId,
            list_id: &ListId,
        ) -> Result<Option<Vote>, VotePersistenceError> {
            let state = self.state.lock().expect("state lock");
            Ok(state
                .votes
                .iter()
                .find(|(v, _)| &v.user_id == user_id && &v.list_id == list_id)
                .map(|(v, _)| v.clone()))
        }

        async fn insert(
            &self,
            user_id: &UserId,
            list_id: &ListId,
            category_id: &CategoryId,
        ) -> Result<Vote, VotePersistenceError> {
            let title = self.title_of(list_id);
            let mut state = self.state.lock().expect("state lock");
            if state.conflicts > 0 {
                state.conflicts -= 1;
                return Err(VotePersistenceError::Conflict);
            }
            if state
                .votes
                .iter()
                .any(|(v, _)| &v.user_id == user_id && &v.category_id == category_id)
            {
                return Err(VotePersistenceError::Conflict);
            }
            let vote = Vote {
                id: VoteId::random(),
                user_id: *user_id,
                list_id: *list_id,
                category_id: *category_id,
                created_at: Utc::now(),
            };
            state.votes.push((vote.clone(), title));
            Ok(vote)
        }

        async fn replace(
            &self,
            old_vote: &VoteId,
            user_id: &UserId,
            list_id: &ListId,
            category_id: &CategoryId,
        ) -> Result<Vote, VotePersistenceError> {
            let title = self.title_of(list_id);
            let mut state = self.state.lock().expect("state lock");
            if state.conflicts > 0 {
                state.conflicts -= 1;
                return Err(VotePersistenceError::Conflict);
            }
            state.votes.retain(|(v, _)| &v.id != old_vote);
            let vote = Vote {
                id: VoteId::random(),
                user_id: *user_id,
                list_id: *list_id,
                category_id: *category_id,
                created_at: Utc::now(),
            };
            state.votes.push((vote.clone(), title));
            Ok(vote)
        }

        async fn delete(&self, vote_id: &VoteId) -> Result<(), VotePersistenceError> {
            let mut state = self.state.lock().expect("state lock");
            state.votes.retain(|(v, _)| &v.id != vote_id);
            Ok(())
        }

        async fn list_for_user(
            &self,
            _user_id: &UserId,
        ) -> Result<Vec<VoteDetail>, VotePersistenceError> {
            Ok(Vec::new())
        }
    }

    fn make_list(category_id: CategoryId, title: &str, is_public: bool) -> List {
        let now = Utc::now();
        List {
            id: ListId::random(),
            title: title.to_owned(),
            description: None,
            slug: format!("{}-abc123", title.to_lowercase().replace(' ', "-")),
            is_public,
            user_id: UserId::random(),
            category_id,
            created_at: now,
            updated_at: now,
        }
    }

    struct Fixture {
        service: VoteService,
        votes: Arc<StubVotes>,
        list_a: List,
        list_b: List,
        private_list: List,
    }

    fn fixture() -> Fixture {
        let category = CategoryId::random();
        let list_a = make_list(category, "Best Movies", true);
        let list_b = make_list(category, "Better Movies", true);
        let private_list = make_list(category, "Secret Movies", false);
        let votes = Arc::new(StubVotes {
            state: Mutex::default(),
            titles: vec![
                (list_a.id, list_a.title.clone()),
                (list_b.id, list_b.title.clone()),
            ],
        });
        let lists = Arc::new(StubLists {
            lists: vec![list_a.clone(), list_b.clone(), private_list.clone()],
        });
        Fixture {
            service: VoteService::new(lists, votes.clone()),
            votes,
            list_a,
            list_b,
            private_list,
        }
    }

    #[tokio::test]
    async fn first_cast_creates_a_vote() {
        let fx = fixture();
        let user = UserId::random();
        let outcome = fx
            .service
            .cast_vote(&user, &fx.list_a.id)
            .await
            .expect("cast succeeds");
        assert_eq!(outcome, VoteOutcome::Created);
        assert_eq!(fx.votes.vote_rows().len(), 1);
    }

    #[tokio::test]
    async fn repeat_cast_for_same_list_is_rejected_without_state_change() {
        let fx = fixture();
        let user = UserId::random();
        fx.service
            .cast_vote(&user, &fx.list_a.id)
            .await
            .expect("first cast");
        let rows_before = fx.votes.vote_rows();

        let err = fx
            .service
            .cast_vote(&user, &fx.list_a.id)
            .await
            .expect_err("second cast is a no-op error");
        assert_eq!(err.code, ErrorCode::AlreadyVoted);
        assert_eq!(fx.votes.vote_rows(), rows_before);
    }

    #[tokio::test]
    async fn casting_for_second_list_in_category_switches() {
        let fx = fixture();
        let user = UserId::random();
        fx.service
            .cast_vote(&user, &fx.list_a.id)
            .await
            .expect("first cast");
        let outcome = fx
            .service
            .cast_vote(&user, &fx.list_b.id)
            .await
            .expect("switch succeeds");

        assert_eq!(
            outcome,
            VoteOutcome::Switched {
                from_title: fx.list_a.title.clone(),
                to_title: fx.list_b.title.clone(),
            }
        );
        let rows = fx.votes.vote_rows();
        assert_eq!(rows.len(), 1, "exactly one vote in the category");
        assert_eq!(rows[0].list_id, fx.list_b.id);
    }

    #[tokio::test]
    async fn cast_rejects_missing_and_private_lists() {
        let fx = fixture();
        let user = UserId::random();

        let err = fx
            .service
            .cast_vote(&user, &ListId::random())
            .await
            .expect_err("unknown list");
        assert_eq!(err.code, ErrorCode::NotFound);

        let err = fx
            .service
            .cast_vote(&user, &fx.private_list.id)
            .await
            .expect_err("private list");
        assert_eq!(err.code, ErrorCode::ListNotPublic);
        assert!(fx.votes.vote_rows().is_empty());
    }

    #[tokio::test]
    async fn lost_uniqueness_race_is_settled_by_one_retry() {
        let fx = fixture();
        let user = UserId::random();
        fx.votes.state.lock().expect("state lock").conflicts = 1;

        let outcome = fx
            .service
            .cast_vote(&user, &fx.list_a.id)
            .await
            .expect("retry settles the cast");
        assert_eq!(outcome, VoteOutcome::Created);
        assert_eq!(fx.votes.vote_rows().len(), 1);
    }

    #[tokio::test]
    async fn remove_vote_deletes_or_reports_not_found() {
        let fx = fixture();
        let user = UserId::random();
        fx.service
            .cast_vote(&user, &fx.list_a.id)
            .await
            .expect("cast");

        fx.service
            .remove_vote(&user, &fx.list_a.id)
            .await
            .expect("remove succeeds");
        assert!(fx.votes.vote_rows().is_empty());

        let err = fx
            .service
            .remove_vote(&user, &fx.list_a.id)
            .await
            .expect_err("nothing left to remove");
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
