//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the SQL migrations exactly. They are used by
//! Diesel for compile-time query validation and type-safe SQL generation.

diesel::table! {
    /// User accounts.
    ///
    /// Email and username are stored in canonical lowercase and carry unique
    /// indexes, as do google_id and reset_token where present.
    users (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Canonical lowercase email (unique).
        email -> Varchar,
        /// Canonical lowercase username in slug form (unique).
        username -> Varchar,
        /// Bcrypt hash; NULL for federated-only accounts.
        password_hash -> Nullable<Varchar>,
        /// Identity provider subject identifier (unique where present).
        google_id -> Nullable<Varchar>,
        /// Which credentials are present: local, federated, or both.
        auth_provider -> Varchar,
        /// Outstanding password-reset token (unique where present).
        reset_token -> Nullable<Varchar>,
        /// Expiry of the outstanding reset token.
        reset_token_expiry -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Fixed category catalogue, seeded at startup.
    categories (id) {
        id -> Uuid,
        name -> Varchar,
        /// Unique URL slug.
        slug -> Varchar,
        description -> Nullable<Text>,
        icon -> Nullable<Varchar>,
    }
}

diesel::table! {
    /// Top-ten lists.
    top_ten_lists (id) {
        id -> Uuid,
        title -> Varchar,
        description -> Nullable<Text>,
        /// Unique URL slug derived from the title plus a random suffix.
        slug -> Varchar,
        is_public -> Bool,
        user_id -> Uuid,
        category_id -> Uuid,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Ranked items belonging to a list; cascade-deleted with it.
    list_items (id) {
        id -> Uuid,
        list_id -> Uuid,
        /// Rank within the list, 1 through 10.
        rank -> Int4,
        title -> Varchar,
        description -> Nullable<Text>,
    }
}

diesel::table! {
    /// Votes. `category_id` is denormalised from the list so the
    /// per-category invariant is a plain unique key on
    /// (user_id, category_id); (user_id, list_id) is unique as well.
    votes (id) {
        id -> Uuid,
        user_id -> Uuid,
        list_id -> Uuid,
        category_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(top_ten_lists -> users (user_id));
diesel::joinable!(top_ten_lists -> categories (category_id));
diesel::joinable!(list_items -> top_ten_lists (list_id));
diesel::joinable!(votes -> top_ten_lists (list_id));
diesel::joinable!(votes -> users (user_id));
diesel::joinable!(votes -> categories (category_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    categories,
    top_ten_lists,
    list_items,
    votes,
);
