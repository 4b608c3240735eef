diesel::table! {
    claims (claim_id) {
        #[sql_name = "Claim_ID"]
        claim_id -> Nullable<Text>,
        #[sql_name = "Food_ID"]
        food_id -> Nullable<Text>,
        #[sql_name = "Receiver_ID"]
        receiver_id -> Nullable<Text>,
        #[sql_name = "Status"]
        status -> Nullable<Text>,
        #[sql_name = "Timestamp"]
        timestamp -> Nullable<Text>,
    }
}

diesel::table! {
    food_listings (food_id) {
        #[sql_name = "Food_ID"]
        food_id -> Nullable<Text>,
        #[sql_name = "Food_Name"]
        food_name -> Nullable<Text>,
        #[sql_name = "Quantity"]
        quantity -> Nullable<BigInt>,
        #[sql_name = "Expiry_Date"]
        expiry_date -> Nullable<Text>,
        #[sql_name = "Provider_ID"]
        provider_id -> Nullable<Text>,
        #[sql_name = "Provider_Type"]
        provider_type -> Nullable<Text>,
        #[sql_name = "Location"]
        location -> Nullable<Text>,
        #[sql_name = "Food_Type"]
        food_type -> Nullable<Text>,
        #[sql_name = "Meal_Type"]
        meal_type -> Nullable<Text>,
    }
}

diesel::table! {
    providers (provider_id) {
        #[sql_name = "Provider_ID"]
        provider_id -> Nullable<Text>,
        #[sql_name = "Name"]
        name -> Nullable<Text>,
        #[sql_name = "Type"]
        provider_type -> Nullable<Text>,
        #[sql_name = "Address"]
        address -> Nullable<Text>,
        #[sql_name = "City"]
        city -> Nullable<Text>,
        #[sql_name = "Contact"]
        contact -> Nullable<Text>,
    }
}

diesel::table! {
    receivers (receiver_id) {
        #[sql_name = "Receiver_ID"]
        receiver_id -> Nullable<Text>,
        #[sql_name = "Name"]
        name -> Nullable<Text>,
        #[sql_name = "Type"]
        receiver_type -> Nullable<Text>,
        #[sql_name = "City"]
        city -> Nullable<Text>,
        #[sql_name = "Contact"]
        contact -> Nullable<Text>,
    }
}

diesel::joinable!(claims -> food_listings (food_id));
diesel::joinable!(claims -> receivers (receiver_id));
diesel::joinable!(food_listings -> providers (provider_id));

diesel::allow_tables_to_appear_in_same_query!(claims, food_listings, providers, receivers,);
