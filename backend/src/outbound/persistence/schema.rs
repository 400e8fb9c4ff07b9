//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the database migrations exactly. They are used
//! by Diesel for compile-time query validation and type-safe SQL generation.
//!
//! # Maintenance
//!
//! When migrations change the schema, update this file to match. The
//! `diesel print-schema` command can generate these definitions from a live
//! database.

diesel::table! {
    /// Contests with their capacity counters.
    ///
    /// `remaining_slots` is only written inside ledger transactions and by
    /// the bounded administrative override.
    contest (id) {
        id -> Uuid,
        #[max_length = 120]
        name -> Varchar,
        prize -> Float8,
        total_slots -> Int4,
        remaining_slots -> Int4,
        start_date -> Timestamptz,
        end_date -> Timestamptz,
        /// `active` or `closed`.
        #[max_length = 16]
        status -> Varchar,
        active_date -> Timestamptz,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    team (id) {
        id -> Uuid,
        #[max_length = 64]
        name -> Varchar,
        #[max_length = 64]
        displayname -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Entrant rows. `selected_contest_id` caches the occupancy record.
    users (id) {
        id -> Uuid,
        age -> Int4,
        selected_contest_id -> Nullable<Uuid>,
    }
}

diesel::table! {
    /// Occupancy records: one row per held slot, at most one per user.
    user_contest (user_id, contest_id) {
        user_id -> Uuid,
        contest_id -> Uuid,
    }
}

diesel::joinable!(user_contest -> contest (contest_id));
diesel::joinable!(user_contest -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(contest, team, user_contest, users);
