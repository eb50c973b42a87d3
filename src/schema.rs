// Nestland schema - process graph tables for Diesel ORM

diesel::table! {
    schema_versions (id) {
        id -> Integer,
        version -> Text,
        name -> Text,
        features -> Text,
        introduced_at -> Text,
    }
}

diesel::table! {
    processes (id) {
        id -> Text,
        slug -> Text,
        name -> Text,
        description -> Nullable<Text>,
        category -> Nullable<Text>,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    steps (id) {
        id -> Text,
        process_id -> Text,
        title -> Text,
        role -> Nullable<Text>,
        lane -> Nullable<Text>,
        order_index -> Nullable<Integer>,
        description -> Nullable<Text>,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    transitions (id) {
        id -> Text,
        process_id -> Text,
        from_step_id -> Text,
        to_step_id -> Text,
        label -> Nullable<Text>,
        created_at -> Text,
    }
}

// Comments reference their process by slug, steps by id (NULL = process-level)
diesel::table! {
    comments (id) {
        id -> Text,
        created_at -> Text,
        process_slug -> Text,
        step_id -> Nullable<Text>,
        body -> Text,
        status -> Text,
        author -> Nullable<Text>,
    }
}

diesel::allow_tables_to_appear_in_same_query!(processes, steps, transitions, comments);
