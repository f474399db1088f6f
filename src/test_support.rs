//! In-memory store double for integration tests.
//!
//! Implements every persistence port over a single mutex so tests can drive
//! the services without PostgreSQL. The vote operations honour the same
//! serialisation contract as the Diesel adapter: unique keys on the
//! effective (user, category) pair and on (user, list), with `replace`
//! performing its check-delete-insert as one critical section. Uniqueness
//! races therefore surface as `Conflict`, exactly as they do against the
//! real store.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::catalogue::{CATEGORY_SEEDS, Category, CategoryId, CategorySummary};
use crate::domain::list::{
    BrowseFilter, List, ListChanges, ListDetail, ListId, ListItem, ListOwner, ListSummary, NewList,
    Page,
};
use crate::domain::ports::{
    CataloguePersistenceError, CategoryRepository, ListPersistenceError, ListRepository, NewUser,
    UserChanges, UserConstraint, UserPersistenceError, UserRepository, VotePersistenceError,
    VoteStore,
};
use crate::domain::user::{Email, User, UserId, Username};
use crate::domain::vote::{Vote, VoteDetail, VoteId, VoteWithList};

const PREVIEW_ITEMS: usize = 3;

#[derive(Default)]
struct StoreState {
    users: Vec<User>,
    categories: Vec<Category>,
    lists: Vec<List>,
    items: Vec<(ListId, Vec<ListItem>)>,
    votes: Vec<Vote>,
}

/// Shared in-memory store implementing all persistence ports.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a category directly, bypassing the seed catalogue.
    pub fn seed_category(&self, name: &str, slug: &str) -> Category {
        let category = Category {
            id: CategoryId::random(),
            name: name.to_owned(),
            slug: slug.to_owned(),
            description: None,
            icon: None,
        };
        self.state
            .lock()
            .expect("store lock")
            .categories
            .push(category.clone());
        category
    }

    /// Install a list directly with no items.
    pub fn seed_list(
        &self,
        owner: &UserId,
        category: &CategoryId,
        title: &str,
        is_public: bool,
    ) -> List {
        let now = Utc::now();
        let list = List {
            id: ListId::random(),
            title: title.to_owned(),
            description: None,
            slug: format!("{}-seeded", title.to_lowercase().replace(' ', "-")),
            is_public,
            user_id: *owner,
            category_id: *category,
            created_at: now,
            updated_at: now,
        };
        let mut state = self.state.lock().expect("store lock");
        state.lists.push(list.clone());
        state.items.push((list.id, Vec::new()));
        list
    }

    /// Install a user directly.
    pub fn seed_user(&self, email: &str, username: &str, password_hash: Option<&str>) -> User {
        let now = Utc::now();
        let user = User {
            id: UserId::random(),
            email: Email::parse(email).expect("seed email is valid"),
            username: Username::parse(username).expect("seed username is valid"),
            password_hash: password_hash.map(str::to_owned),
            google_id: password_hash.is_none().then(|| format!("seed-{username}")),
            auth_provider: if password_hash.is_some() {
                crate::domain::AuthProvider::Local
            } else {
                crate::domain::AuthProvider::Federated
            },
            reset_token: None,
            reset_token_expiry: None,
            created_at: now,
            updated_at: now,
        };
        self.state
            .lock()
            .expect("store lock")
            .users
            .push(user.clone());
        user
    }

    /// Snapshot of every vote row, for invariant assertions.
    pub fn vote_rows(&self) -> Vec<Vote> {
        self.state.lock().expect("store lock").votes.clone()
    }

    /// Snapshot of every user row.
    pub fn user_rows(&self) -> Vec<User> {
        self.state.lock().expect("store lock").users.clone()
    }
}

fn detail_for(state: &StoreState, list: &List) -> Result<ListDetail, ListPersistenceError> {
    let owner = state
        .users
        .iter()
        .find(|u| u.id == list.user_id)
        .ok_or_else(|| ListPersistenceError::query("list owner missing"))?;
    let category = state
        .categories
        .iter()
        .find(|c| c.id == list.category_id)
        .ok_or_else(|| ListPersistenceError::query("list category missing"))?;
    let items = state
        .items
        .iter()
        .find(|(id, _)| *id == list.id)
        .map(|(_, items)| items.clone())
        .unwrap_or_default();
    let vote_count = state.votes.iter().filter(|v| v.list_id == list.id).count() as i64;
    Ok(ListDetail {
        id: list.id,
        title: list.title.clone(),
        description: list.description.clone(),
        slug: list.slug.clone(),
        is_public: list.is_public,
        user: ListOwner {
            id: owner.id,
            username: owner.username.clone(),
        },
        category: category.clone(),
        items,
        vote_count,
        created_at: list.created_at,
        updated_at: list.updated_at,
    })
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserPersistenceError> {
        let state = self.state.lock().expect("store lock");
        Ok(state.users.iter().find(|u| &u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, UserPersistenceError> {
        let state = self.state.lock().expect("store lock");
        Ok(state.users.iter().find(|u| &u.email == email).cloned())
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, UserPersistenceError> {
        let state = self.state.lock().expect("store lock");
        Ok(state
            .users
            .iter()
            .find(|u| u.username.as_str() == username)
            .cloned())
    }

    async fn find_by_google_id(
        &self,
        google_id: &str,
    ) -> Result<Option<User>, UserPersistenceError> {
        let state = self.state.lock().expect("store lock");
        Ok(state
            .users
            .iter()
            .find(|u| u.google_id.as_deref() == Some(google_id))
            .cloned())
    }

    async fn create(&self, new_user: NewUser) -> Result<User, UserPersistenceError> {
        let mut state = self.state.lock().expect("store lock");
        if state.users.iter().any(|u| u.email == new_user.email) {
            return Err(UserPersistenceError::Conflict {
                constraint: UserConstraint::Email,
            });
        }
        if state.users.iter().any(|u| u.username == new_user.username) {
            return Err(UserPersistenceError::Conflict {
                constraint: UserConstraint::Username,
            });
        }
        if let Some(google_id) = new_user.google_id.as_deref()
            && state
                .users
                .iter()
                .any(|u| u.google_id.as_deref() == Some(google_id))
        {
            return Err(UserPersistenceError::Conflict {
                constraint: UserConstraint::GoogleId,
            });
        }
        let now = Utc::now();
        let user = User {
            id: UserId::random(),
            email: new_user.email,
            username: new_user.username,
            password_hash: new_user.password_hash,
            google_id: new_user.google_id,
            auth_provider: new_user.auth_provider,
            reset_token: None,
            reset_token_expiry: None,
            created_at: now,
            updated_at: now,
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn update(
        &self,
        id: &UserId,
        changes: UserChanges,
    ) -> Result<User, UserPersistenceError> {
        let mut state = self.state.lock().expect("store lock");
        let user = state
            .users
            .iter_mut()
            .find(|u| &u.id == id)
            .ok_or_else(|| UserPersistenceError::query("record not found"))?;
        if let Some(google_id) = changes.google_id {
            user.google_id = Some(google_id);
        }
        if let Some(provider) = changes.auth_provider {
            user.auth_provider = provider;
        }
        if let Some(token) = changes.reset_token {
            user.reset_token = token;
        }
        if let Some(expiry) = changes.reset_token_expiry {
            user.reset_token_expiry = expiry;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }
}

#[async_trait]
impl CategoryRepository for InMemoryStore {
    async fn list_with_counts(&self) -> Result<Vec<CategorySummary>, CataloguePersistenceError> {
        let state = self.state.lock().expect("store lock");
        let mut summaries: Vec<CategorySummary> = state
            .categories
            .iter()
            .map(|category| CategorySummary {
                category: category.clone(),
                list_count: state
                    .lists
                    .iter()
                    .filter(|l| l.category_id == category.id)
                    .count() as i64,
            })
            .collect();
        summaries.sort_by(|a, b| a.category.name.cmp(&b.category.name));
        Ok(summaries)
    }

    async fn find_by_id(
        &self,
        id: &CategoryId,
    ) -> Result<Option<Category>, CataloguePersistenceError> {
        let state = self.state.lock().expect("store lock");
        Ok(state.categories.iter().find(|c| &c.id == id).cloned())
    }

    async fn seed_catalogue(&self) -> Result<(), CataloguePersistenceError> {
        let mut state = self.state.lock().expect("store lock");
        for seed in CATEGORY_SEEDS {
            if state.categories.iter().any(|c| c.slug == seed.slug) {
                continue;
            }
            state.categories.push(Category {
                id: CategoryId::random(),
                name: seed.name.to_owned(),
                slug: seed.slug.to_owned(),
                description: Some(seed.description.to_owned()),
                icon: Some(seed.icon.to_owned()),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ListRepository for InMemoryStore {
    async fn find_by_id(&self, id: &ListId) -> Result<Option<List>, ListPersistenceError> {
        let state = self.state.lock().expect("store lock");
        Ok(state.lists.iter().find(|l| &l.id == id).cloned())
    }

    async fn find_detail(&self, key: &str) -> Result<Option<ListDetail>, ListPersistenceError> {
        let state = self.state.lock().expect("store lock");
        let list = state
            .lists
            .iter()
            .find(|l| l.id.to_string() == key || l.slug == key);
        match list {
            Some(list) => Ok(Some(detail_for(&state, list)?)),
            None => Ok(None),
        }
    }

    async fn create(&self, new_list: NewList) -> Result<ListDetail, ListPersistenceError> {
        let mut state = self.state.lock().expect("store lock");
        if state.lists.iter().any(|l| l.slug == new_list.slug) {
            return Err(ListPersistenceError::SlugConflict);
        }
        let now = Utc::now();
        let list = List {
            id: ListId::random(),
            title: new_list.title,
            description: new_list.description,
            slug: new_list.slug,
            is_public: new_list.is_public,
            user_id: new_list.user_id,
            category_id: new_list.category_id,
            created_at: now,
            updated_at: now,
        };
        let items: Vec<ListItem> = new_list
            .items
            .iter()
            .enumerate()
            .map(|(index, item)| ListItem {
                rank: i32::try_from(index).unwrap_or(i32::MAX - 1) + 1,
                title: item.title.clone(),
                description: item.description.clone(),
            })
            .collect();
        state.lists.push(list.clone());
        state.items.push((list.id, items));
        detail_for(&state, &list)
    }

    async fn update(
        &self,
        id: &ListId,
        changes: ListChanges,
    ) -> Result<ListDetail, ListPersistenceError> {
        let mut state = self.state.lock().expect("store lock");
        let position = state
            .lists
            .iter()
            .position(|l| &l.id == id)
            .ok_or_else(|| ListPersistenceError::query("record not found"))?;
        {
            let list = &mut state.lists[position];
            if let Some(title) = changes.title {
                list.title = title;
            }
            if let Some(description) = changes.description {
                list.description = description;
            }
            if let Some(category_id) = changes.category_id {
                list.category_id = category_id;
            }
            if let Some(is_public) = changes.is_public {
                list.is_public = is_public;
            }
            list.updated_at = Utc::now();
        }
        if let Some(new_items) = changes.items {
            let replacement: Vec<ListItem> = new_items
                .iter()
                .enumerate()
                .map(|(index, item)| ListItem {
                    rank: i32::try_from(index).unwrap_or(i32::MAX - 1) + 1,
                    title: item.title.clone(),
                    description: item.description.clone(),
                })
                .collect();
            if let Some(entry) = state.items.iter_mut().find(|(item_id, _)| item_id == id) {
                entry.1 = replacement;
            } else {
                state.items.push((*id, replacement));
            }
        }
        let list = state.lists[position].clone();
        detail_for(&state, &list)
    }

    async fn delete(&self, id: &ListId) -> Result<(), ListPersistenceError> {
        // Cascade contract: items and votes go with the list.
        let mut state = self.state.lock().expect("store lock");
        state.lists.retain(|l| &l.id != id);
        state.items.retain(|(item_id, _)| item_id != id);
        state.votes.retain(|v| &v.list_id != id);
        Ok(())
    }

    async fn browse(
        &self,
        filter: &BrowseFilter,
    ) -> Result<Page<ListSummary>, ListPersistenceError> {
        let state = self.state.lock().expect("store lock");
        let mut matches: Vec<&List> = state
            .lists
            .iter()
            .filter(|l| l.is_public || filter.include_private)
            .filter(|l| filter.user_id.is_none_or(|user_id| l.user_id == user_id))
            .filter(|l| {
                filter.category_slug.as_deref().is_none_or(|slug| {
                    state
                        .categories
                        .iter()
                        .any(|c| c.id == l.category_id && c.slug == slug)
                })
            })
            .collect();

        let count_for = |list: &List| state.votes.iter().filter(|v| v.list_id == list.id).count();
        matches.sort_by(|a, b| {
            count_for(b)
                .cmp(&count_for(a))
                .then(b.created_at.cmp(&a.created_at))
        });

        let total = matches.len() as i64;
        let offset = usize::try_from(filter.offset()).unwrap_or(usize::MAX);
        let summaries = matches
            .into_iter()
            .skip(offset)
            .take(filter.per_page as usize)
            .map(|list| {
                let detail = detail_for(&state, list)?;
                Ok(ListSummary {
                    id: detail.id,
                    title: detail.title,
                    description: detail.description,
                    slug: detail.slug,
                    is_public: detail.is_public,
                    user: detail.user,
                    category: detail.category,
                    items: detail.items.into_iter().take(PREVIEW_ITEMS).collect(),
                    vote_count: detail.vote_count,
                    created_at: detail.created_at,
                })
            })
            .collect::<Result<Vec<_>, ListPersistenceError>>()?;

        Ok(Page::new(summaries, filter.page, filter.per_page, total))
    }
}

#[async_trait]
impl VoteStore for InMemoryStore {
    async fn find_for_user_in_category(
        &self,
        user_id: &UserId,
        category_id: &CategoryId,
    ) -> Result<Option<VoteWithList>, VotePersistenceError> {
        let state = self.state.lock().expect("store lock");
        Ok(state
            .votes
            .iter()
            .find(|v| &v.user_id == user_id && &v.category_id == category_id)
            .map(|vote| VoteWithList {
                vote: vote.clone(),
                list_title: state
                    .lists
                    .iter()
                    .find(|l| l.id == vote.list_id)
                    .map(|l| l.title.clone())
                    .unwrap_or_default(),
            }))
    }

    async fn find_by_user_and_list(
        &self,
        user_id: &UserId,
        list_id: &ListId,
    ) -> Result<Option<Vote>, VotePersistenceError> {
        let state = self.state.lock().expect("store lock");
        Ok(state
            .votes
            .iter()
            .find(|v| &v.user_id == user_id && &v.list_id == list_id)
            .cloned())
    }

    async fn insert(
        &self,
        user_id: &UserId,
        list_id: &ListId,
        category_id: &CategoryId,
    ) -> Result<Vote, VotePersistenceError> {
        let mut state = self.state.lock().expect("store lock");
        let collides = state.votes.iter().any(|v| {
            &v.user_id == user_id && (&v.category_id == category_id || &v.list_id == list_id)
        });
        if collides {
            return Err(VotePersistenceError::Conflict);
        }
        let vote = Vote {
            id: VoteId::random(),
            user_id: *user_id,
            list_id: *list_id,
            category_id: *category_id,
            created_at: Utc::now(),
        };
        state.votes.push(vote.clone());
        Ok(vote)
    }

    async fn replace(
        &self,
        old_vote: &VoteId,
        user_id: &UserId,
        list_id: &ListId,
        category_id: &CategoryId,
    ) -> Result<Vote, VotePersistenceError> {
        // Single critical section: the uniqueness check (excluding the row
        // being replaced), the delete, and the insert commit together or
        // not at all, mirroring the Diesel adapter's transaction.
        let mut state = self.state.lock().expect("store lock");
        let collides = state.votes.iter().any(|v| {
            &v.id != old_vote
                && &v.user_id == user_id
                && (&v.category_id == category_id || &v.list_id == list_id)
        });
        if collides {
            return Err(VotePersistenceError::Conflict);
        }
        state.votes.retain(|v| &v.id != old_vote);
        let vote = Vote {
            id: VoteId::random(),
            user_id: *user_id,
            list_id: *list_id,
            category_id: *category_id,
            created_at: Utc::now(),
        };
        state.votes.push(vote.clone());
        Ok(vote)
    }

    async fn delete(&self, vote_id: &VoteId) -> Result<(), VotePersistenceError> {
        let mut state = self.state.lock().expect("store lock");
        state.votes.retain(|v| &v.id != vote_id);
        Ok(())
    }

    async fn list_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<VoteDetail>, VotePersistenceError> {
        let state = self.state.lock().expect("store lock");
        let mut details: Vec<VoteDetail> = state
            .votes
            .iter()
            .filter(|v| &v.user_id == user_id)
            .map(|vote| {
                let list = state.lists.iter().find(|l| l.id == vote.list_id);
                let category = state
                    .categories
                    .iter()
                    .find(|c| c.id == vote.category_id)
                    .cloned()
                    .unwrap_or(Category {
                        id: vote.category_id,
                        name: String::new(),
                        slug: String::new(),
                        description: None,
                        icon: None,
                    });
                VoteDetail {
                    id: vote.id,
                    list_id: vote.list_id,
                    list_title: list.map(|l| l.title.clone()).unwrap_or_default(),
                    list_slug: list.map(|l| l.slug.clone()).unwrap_or_default(),
                    category,
                    created_at: vote.created_at,
                }
            })
            .collect();
        details.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(details)
    }
}
