diesel::table! {
    users (id) {
        id -> Uuid,
        username -> Varchar,
        email -> Varchar,
        token -> Varchar,
        is_staff -> Bool,
        is_superuser -> Bool,
    }
}

diesel::table! {
    boards (id) {
        id -> Uuid,
        name -> Varchar,
        description -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    columns (id) {
        id -> Uuid,
        board_id -> Uuid,
        name -> Varchar,
        position -> Integer,
        color -> Varchar,
    }
}

diesel::table! {
    cards (id) {
        id -> Uuid,
        column_id -> Uuid,
        title -> Varchar,
        description -> Text,
        position -> Integer,
        created_by -> Nullable<Uuid>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(columns -> boards (board_id));
diesel::joinable!(cards -> columns (column_id));
diesel::joinable!(cards -> users (created_by));

diesel::allow_tables_to_appear_in_same_query!(users, boards, columns, cards);
