table! {
    categories (id) {
        id -> Int4,
        name -> Text,
    }
}

table! {
    comments (id) {
        id -> Int4,
        text -> Text,
        user_id -> Int4,
        restaurant_id -> Int4,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

table! {
    favorites (id) {
        id -> Int4,
        user_id -> Int4,
        restaurant_id -> Int4,
        created_at -> Timestamp,
    }
}

table! {
    followships (id) {
        id -> Int4,
        follower_id -> Int4,
        following_id -> Int4,
        created_at -> Timestamp,
    }
}

table! {
    likes (id) {
        id -> Int4,
        user_id -> Int4,
        restaurant_id -> Int4,
        created_at -> Timestamp,
    }
}

table! {
    restaurants (id) {
        id -> Int4,
        name -> Text,
        tel -> Text,
        address -> Text,
        opening_hours -> Text,
        description -> Text,
        image -> Nullable<Text>,
        category_id -> Int4,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

table! {
    users (id) {
        id -> Int4,
        name -> Text,
        email -> Text,
        password -> Text,
        is_admin -> Bool,
        image -> Nullable<Text>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

joinable!(restaurants -> categories (category_id));

allow_tables_to_appear_in_same_query!(
    categories,
    comments,
    favorites,
    followships,
    likes,
    restaurants,
    users,
);
