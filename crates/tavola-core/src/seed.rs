use std::sync::Arc;

use chrono::Utc;
use tavola_db::Database;
use tavola_types::models::{NewMenuItem, NotificationPrefs, User, UserRole};
use tracing::info;

use crate::password::hash_password;
use crate::{RepoResult, blocking};

/// Demo accounts: `(email, password, name, role)`.
const ACCOUNTS: &[(&str, &str, &str, UserRole)] = &[
    ("staff@restaurant.com", "staff123", "John Staff", UserRole::Staff),
    ("guest@restaurant.com", "guest123", "Jane Customer", UserRole::Guest),
];

/// `(name, description, price, category, image_url, available)`
const SAMPLE_MENU: &[(&str, &str, f64, &str, &str, bool)] = &[
    ("Bruschetta", "Grilled bread rubbed with garlic and topped with diced tomatoes, olive oil, and basil", 8.99, "Appetizers", "https://images.unsplash.com/photo-1572695157366-5e585ab2b69f", true),
    ("Calamari Fritti", "Lightly battered and fried squid served with marinara sauce", 12.99, "Appetizers", "https://images.unsplash.com/photo-1599487488170-d11ec9c172f0", true),
    ("Caprese Salad", "Fresh mozzarella, tomatoes, and basil drizzled with balsamic glaze", 10.99, "Appetizers", "https://images.unsplash.com/photo-1608897013039-887f21d8c804", true),
    ("Grilled Salmon", "Fresh Atlantic salmon grilled to perfection with lemon butter sauce", 24.99, "Main Course", "https://images.unsplash.com/photo-1467003909585-2f8a72700288", true),
    ("Ribeye Steak", "12oz premium ribeye steak with garlic mashed potatoes and seasonal vegetables", 32.99, "Main Course", "https://images.unsplash.com/photo-1546833999-b9f581a1996d", true),
    ("Chicken Parmesan", "Breaded chicken breast topped with marinara and melted mozzarella", 18.99, "Main Course", "https://images.unsplash.com/photo-1632778149955-e80f8ceca2e8", true),
    ("Seafood Paella", "Spanish rice dish with shrimp, mussels, clams, and saffron", 26.99, "Main Course", "https://images.unsplash.com/photo-1534080564583-6be75777b70a", true),
    ("Spaghetti Carbonara", "Classic Italian pasta with eggs, cheese, pancetta, and black pepper", 16.99, "Pasta", "https://images.unsplash.com/photo-1612874742237-6526221588e3", true),
    ("Fettuccine Alfredo", "Creamy Alfredo sauce with fresh parmesan cheese", 15.99, "Pasta", "https://images.unsplash.com/photo-1645112411341-6c4fd023714a", true),
    ("Penne Arrabbiata", "Spicy tomato sauce with garlic and red chili peppers", 14.99, "Pasta", "https://images.unsplash.com/photo-1621996346565-e3dbc646d9a9", true),
    ("Margherita Pizza", "Classic pizza with tomato sauce, mozzarella, and fresh basil", 13.99, "Pizza", "https://images.unsplash.com/photo-1574071318508-1cdbab80d002", true),
    ("Pepperoni Pizza", "Loaded with pepperoni and mozzarella cheese", 15.99, "Pizza", "https://images.unsplash.com/photo-1628840042765-356cda07504e", true),
    ("Quattro Formaggi", "Four cheese pizza with mozzarella, gorgonzola, parmesan, and fontina", 17.99, "Pizza", "https://images.unsplash.com/photo-1571997478779-2adcbbe9ab2f", true),
    ("Tiramisu", "Classic Italian dessert with coffee-soaked ladyfingers and mascarpone", 7.99, "Desserts", "https://images.unsplash.com/photo-1571877227200-a0d98ea607e9", true),
    ("Chocolate Lava Cake", "Warm chocolate cake with molten center, served with vanilla ice cream", 8.99, "Desserts", "https://images.unsplash.com/photo-1624353365286-3f8d62daad51", true),
    ("Crème Brûlée", "Rich custard topped with caramelized sugar", 7.99, "Desserts", "https://images.unsplash.com/photo-1470124182917-cc6e71b22ecc", true),
    ("Fresh Lemonade", "Freshly squeezed lemon juice with a touch of sweetness", 3.99, "Beverages", "https://images.unsplash.com/photo-1523677011781-c91d1bbe2f93", true),
    ("Italian Espresso", "Rich and bold espresso shot", 2.99, "Beverages", "https://images.unsplash.com/photo-1510591509098-f4fdc6d0ff04", true),
    ("Cappuccino", "Espresso with steamed milk and foam", 4.99, "Beverages", "https://images.unsplash.com/photo-1572442388796-11668a67e53d", true),
];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub menu_items: usize,
}

/// Add the demo accounts that are missing, and the sample menu when the
/// menu table is empty. Running it again adds nothing.
pub async fn seed_database(db: &Arc<Database>) -> RepoResult<SeedSummary> {
    let summary = blocking(db, |db| {
        let mut summary = SeedSummary::default();

        for &(email, password, name, role) in ACCOUNTS {
            if db.get_user_by_email(email)?.is_some() {
                continue;
            }
            let user = User {
                id: 0,
                remote_id: None,
                email: email.to_string(),
                name: name.to_string(),
                role,
                notifications: NotificationPrefs::default(),
                created_at: Utc::now(),
            };
            db.insert_user(&user, &hash_password(password)?)?;
            summary.users += 1;
        }

        if db.count_menu_items()? == 0 {
            let now = Utc::now();
            for &(name, description, price, category, image_url, available) in SAMPLE_MENU {
                let item = NewMenuItem {
                    name: name.to_string(),
                    description: description.to_string(),
                    price,
                    image_url: image_url.to_string(),
                    category: category.to_string(),
                    available,
                };
                db.insert_menu_item(&item, now)?;
                summary.menu_items += 1;
            }
        }

        Ok(summary)
    })
    .await?;

    if summary != SeedSummary::default() {
        info!(users = summary.users, menu_items = summary.menu_items, "seeded database");
    }
    Ok(summary)
}
