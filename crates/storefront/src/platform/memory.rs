//! In-memory data platform for tests.
//!
//! Behaves like the hosted platform closely enough for route tests: ids are
//! assigned sequentially, lists come back in the same order, and user-scoped
//! calls only touch the caller's rows. Failure switches let tests exercise the
//! degraded paths.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

use millets_core::{
    BookingId, CartLineId, Email, MenuItemId, OrderId, OrderStatus, ReviewId, Role, UserId,
};

use super::types::{
    AuthSession, AuthUser, Booking, CartLine, ContactMessage, MenuItem, MenuItemInput, NewBooking,
    NewOrder, NewReview, Order, Profile, Review, SignUp,
};
use super::{DataPlatform, PlatformError};

#[derive(Default)]
struct Inner {
    accounts: HashMap<String, (UserId, String)>,
    tokens: HashMap<String, UserId>,
    roles: HashMap<UserId, Role>,
    menu: Vec<MenuItem>,
    cart: Vec<CartLine>,
    orders: Vec<Order>,
    bookings: Vec<Booking>,
    reviews: Vec<Review>,
    contacts: Vec<ContactMessage>,
    profiles: HashMap<UserId, Profile>,
    next_id: i64,
    fail_role_lookup: bool,
    fail_cart_clear: bool,
    fail_writes: bool,
    fail_reads: bool,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn check_writable(&self) -> Result<(), PlatformError> {
        if self.fail_writes {
            return Err(PlatformError::Api {
                status: 503,
                message: "writes disabled".to_string(),
            });
        }
        Ok(())
    }

    fn check_readable(&self) -> Result<(), PlatformError> {
        if self.fail_reads {
            return Err(PlatformError::Api {
                status: 503,
                message: "reads disabled".to_string(),
            });
        }
        Ok(())
    }

    fn issue_token(&mut self, user: UserId) -> String {
        let token = format!("token-{}", Uuid::new_v4());
        self.tokens.insert(token.clone(), user);
        token
    }
}

/// Data platform held entirely in memory.
#[derive(Default)]
pub struct MemoryPlatform {
    inner: Mutex<Inner>,
}

impl MemoryPlatform {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an account. A role record is stored when `role` is given.
    pub fn add_user(&self, email: &str, password: &str, role: Option<Role>) -> UserId {
        let mut inner = self.lock();
        let id = UserId::new(Uuid::new_v4());
        inner
            .accounts
            .insert(email.to_lowercase(), (id, password.to_string()));
        if let Some(role) = role {
            inner.roles.insert(id, role);
        }
        id
    }

    /// Add a menu item and return it.
    pub fn add_menu_item(&self, name: &str, price: rust_decimal::Decimal, category: &str) -> MenuItem {
        let mut inner = self.lock();
        let item = MenuItem {
            id: MenuItemId::new(inner.next_id()),
            name: name.to_string(),
            price,
            category: category.to_string(),
            description: None,
            image_url: None,
        };
        inner.menu.push(item.clone());
        item
    }

    /// Make every role lookup fail.
    pub fn fail_role_lookups(&self, fail: bool) {
        self.lock().fail_role_lookup = fail;
    }

    /// Make clearing a cart fail.
    pub fn fail_cart_clear(&self, fail: bool) {
        self.lock().fail_cart_clear = fail;
    }

    /// Make every data write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Make single-item and cart reads fail.
    pub fn fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    /// Invalidate all access tokens issued so far.
    pub fn revoke_all_tokens(&self) {
        self.lock().tokens.clear();
    }

    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        self.lock().orders.clone()
    }

    #[must_use]
    pub fn cart_of(&self, user: UserId) -> Vec<CartLine> {
        self.lock()
            .cart
            .iter()
            .filter(|l| l.user_id == user)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn menu(&self) -> Vec<MenuItem> {
        self.lock().menu.clone()
    }

    #[must_use]
    pub fn bookings(&self) -> Vec<Booking> {
        self.lock().bookings.clone()
    }

    #[must_use]
    pub fn reviews(&self) -> Vec<Review> {
        self.lock().reviews.clone()
    }

    #[must_use]
    pub fn contacts(&self) -> Vec<ContactMessage> {
        self.lock().contacts.clone()
    }

    #[must_use]
    pub fn role_record(&self, user: UserId) -> Option<Role> {
        self.lock().roles.get(&user).copied()
    }

    #[must_use]
    pub fn user_id(&self, email: &str) -> Option<UserId> {
        self.lock()
            .accounts
            .get(&email.to_lowercase())
            .map(|(id, _)| *id)
    }
}

fn newest_first<T, F>(rows: &mut [T], key: F)
where
    F: Fn(&T) -> (chrono::DateTime<Utc>, i64),
{
    rows.sort_by_key(|row| std::cmp::Reverse(key(row)));
}

#[async_trait]
impl DataPlatform for MemoryPlatform {
    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthSession, PlatformError> {
        let mut inner = self.lock();
        let Some((id, stored)) = inner.accounts.get(email.as_str()).cloned() else {
            return Err(PlatformError::InvalidCredentials);
        };
        if stored != password.expose_secret() {
            return Err(PlatformError::InvalidCredentials);
        }
        let access_token = inner.issue_token(id);
        Ok(AuthSession {
            access_token,
            refresh_token: None,
            user: AuthUser {
                id,
                email: Some(email.to_string()),
            },
        })
    }

    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<SignUp, PlatformError> {
        let mut inner = self.lock();
        if inner.accounts.contains_key(email.as_str()) {
            return Err(PlatformError::Conflict("User already registered".to_string()));
        }
        let id = UserId::new(Uuid::new_v4());
        inner.accounts.insert(
            email.as_str().to_string(),
            (id, password.expose_secret().to_string()),
        );
        let user = AuthUser {
            id,
            email: Some(email.to_string()),
        };
        let access_token = inner.issue_token(id);
        Ok(SignUp {
            user: user.clone(),
            session: Some(AuthSession {
                access_token,
                refresh_token: None,
                user,
            }),
        })
    }

    async fn current_user(&self, access_token: &str) -> Result<AuthUser, PlatformError> {
        let inner = self.lock();
        let id = *inner
            .tokens
            .get(access_token)
            .ok_or(PlatformError::Unauthorized)?;
        let email = inner
            .accounts
            .iter()
            .find(|(_, (uid, _))| *uid == id)
            .map(|(email, _)| email.clone());
        Ok(AuthUser { id, email })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), PlatformError> {
        self.lock().tokens.remove(access_token);
        Ok(())
    }

    async fn role_of(&self, user: UserId) -> Result<Option<Role>, PlatformError> {
        let inner = self.lock();
        if inner.fail_role_lookup {
            return Err(PlatformError::Api {
                status: 500,
                message: "role lookup failed".to_string(),
            });
        }
        Ok(inner.roles.get(&user).copied())
    }

    async fn insert_role(&self, user: UserId, role: Role) -> Result<(), PlatformError> {
        let mut inner = self.lock();
        inner.check_writable()?;
        if inner.roles.contains_key(&user) {
            return Err(PlatformError::Conflict(format!("role for {user}")));
        }
        inner.roles.insert(user, role);
        Ok(())
    }

    async fn set_role(&self, user: UserId, role: Role) -> Result<(), PlatformError> {
        let mut inner = self.lock();
        inner.check_writable()?;
        inner.roles.insert(user, role);
        Ok(())
    }

    async fn list_menu(&self, category: Option<&str>) -> Result<Vec<MenuItem>, PlatformError> {
        let inner = self.lock();
        let mut items: Vec<MenuItem> = inner
            .menu
            .iter()
            .filter(|item| category.is_none_or(|c| item.category == c))
            .cloned()
            .collect();
        items.sort_by_key(|item| item.id);
        Ok(items)
    }

    async fn menu_item(&self, id: MenuItemId) -> Result<Option<MenuItem>, PlatformError> {
        let inner = self.lock();
        inner.check_readable()?;
        Ok(inner.menu.iter().find(|item| item.id == id).cloned())
    }

    async fn create_menu_item(&self, input: &MenuItemInput) -> Result<MenuItem, PlatformError> {
        let mut inner = self.lock();
        inner.check_writable()?;
        let item = MenuItem {
            id: MenuItemId::new(inner.next_id()),
            name: input.name.clone(),
            price: input.price,
            category: input.category.clone(),
            description: input.description.clone(),
            image_url: input.image_url.clone(),
        };
        inner.menu.push(item.clone());
        Ok(item)
    }

    async fn update_menu_item(
        &self,
        id: MenuItemId,
        input: &MenuItemInput,
    ) -> Result<MenuItem, PlatformError> {
        let mut inner = self.lock();
        inner.check_writable()?;
        let item = inner
            .menu
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| PlatformError::NotFound(format!("menu item {id}")))?;
        item.name.clone_from(&input.name);
        item.price = input.price;
        item.category.clone_from(&input.category);
        item.description.clone_from(&input.description);
        item.image_url.clone_from(&input.image_url);
        Ok(item.clone())
    }

    async fn delete_menu_item(&self, id: MenuItemId) -> Result<(), PlatformError> {
        let mut inner = self.lock();
        inner.check_writable()?;
        inner.menu.retain(|item| item.id != id);
        Ok(())
    }

    async fn cart_lines(&self, user: UserId) -> Result<Vec<CartLine>, PlatformError> {
        let inner = self.lock();
        inner.check_readable()?;
        let mut lines: Vec<CartLine> = inner
            .cart
            .iter()
            .filter(|line| line.user_id == user)
            .map(|line| CartLine {
                item: inner.menu.iter().find(|m| m.id == line.item_id).cloned(),
                ..line.clone()
            })
            .collect();
        newest_first(&mut lines, |l| (l.created_at, l.id.as_i64()));
        Ok(lines)
    }

    async fn insert_cart_line(
        &self,
        user: UserId,
        item: MenuItemId,
        quantity: u32,
    ) -> Result<(), PlatformError> {
        let mut inner = self.lock();
        inner.check_writable()?;
        if !inner.menu.iter().any(|m| m.id == item) {
            return Err(PlatformError::Api {
                status: 409,
                message: format!("menu item {item} does not exist"),
            });
        }
        let id = CartLineId::new(inner.next_id());
        inner.cart.push(CartLine {
            id,
            user_id: user,
            item_id: item,
            quantity,
            created_at: Utc::now(),
            item: None,
        });
        Ok(())
    }

    async fn set_cart_quantity(
        &self,
        user: UserId,
        line: CartLineId,
        quantity: u32,
    ) -> Result<(), PlatformError> {
        let mut inner = self.lock();
        inner.check_writable()?;
        if let Some(row) = inner
            .cart
            .iter_mut()
            .find(|row| row.id == line && row.user_id == user)
        {
            row.quantity = quantity;
        }
        Ok(())
    }

    async fn remove_cart_line(
        &self,
        user: UserId,
        line: CartLineId,
    ) -> Result<(), PlatformError> {
        let mut inner = self.lock();
        inner.check_writable()?;
        inner
            .cart
            .retain(|row| !(row.id == line && row.user_id == user));
        Ok(())
    }

    async fn clear_cart(&self, user: UserId) -> Result<(), PlatformError> {
        let mut inner = self.lock();
        if inner.fail_cart_clear {
            return Err(PlatformError::Api {
                status: 500,
                message: "cart delete failed".to_string(),
            });
        }
        inner.cart.retain(|row| row.user_id != user);
        Ok(())
    }

    async fn create_order(&self, order: &NewOrder) -> Result<Order, PlatformError> {
        let mut inner = self.lock();
        inner.check_writable()?;
        let stored = Order {
            id: OrderId::new(inner.next_id()),
            user_id: Some(order.user_id),
            name: order.name.clone(),
            phone: order.phone.clone(),
            email: order.email.as_ref().map(ToString::to_string),
            address: order.address.clone(),
            pincode: order.pincode.clone(),
            delivery_method: order.delivery_method,
            payment_method: order.payment_method,
            special_instructions: order.special_instructions.clone(),
            items: order.items.clone(),
            total: order.total,
            status: order.status,
            created_at: Utc::now(),
        };
        inner.orders.push(stored.clone());
        Ok(stored)
    }

    async fn orders_for(&self, user: UserId) -> Result<Vec<Order>, PlatformError> {
        let mut orders: Vec<Order> = self
            .lock()
            .orders
            .iter()
            .filter(|o| o.user_id == Some(user))
            .cloned()
            .collect();
        newest_first(&mut orders, |o| (o.created_at, o.id.as_i64()));
        Ok(orders)
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, PlatformError> {
        Ok(self.lock().orders.iter().find(|o| o.id == id).cloned())
    }

    async fn all_orders(&self) -> Result<Vec<Order>, PlatformError> {
        let mut orders = self.lock().orders.clone();
        newest_first(&mut orders, |o| (o.created_at, o.id.as_i64()));
        Ok(orders)
    }

    async fn set_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, PlatformError> {
        let mut inner = self.lock();
        inner.check_writable()?;
        let order = inner
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| PlatformError::NotFound(format!("order {id}")))?;
        order.status = status;
        Ok(order.clone())
    }

    async fn create_booking(&self, booking: &NewBooking) -> Result<Booking, PlatformError> {
        let mut inner = self.lock();
        inner.check_writable()?;
        let stored = Booking {
            id: BookingId::new(inner.next_id()),
            user_id: booking.user_id,
            name: booking.name.clone(),
            email: booking.email.to_string(),
            phone: booking.phone.clone(),
            guests: booking.guests,
            date: booking.date,
            time: booking.time,
            occasion: booking.occasion.clone(),
            table_preference: booking.table_preference.clone(),
            special_requests: booking.special_requests.clone(),
            confirmation_method: booking.confirmation_method,
            status: booking.status,
            created_at: Utc::now(),
        };
        inner.bookings.push(stored.clone());
        Ok(stored)
    }

    async fn bookings_for(&self, user: UserId) -> Result<Vec<Booking>, PlatformError> {
        let mut bookings: Vec<Booking> = self
            .lock()
            .bookings
            .iter()
            .filter(|b| b.user_id == Some(user))
            .cloned()
            .collect();
        newest_first(&mut bookings, |b| (b.created_at, b.id.as_i64()));
        Ok(bookings)
    }

    async fn booking(&self, id: BookingId) -> Result<Option<Booking>, PlatformError> {
        Ok(self.lock().bookings.iter().find(|b| b.id == id).cloned())
    }

    async fn reviews_for(&self, item: MenuItemId) -> Result<Vec<Review>, PlatformError> {
        let mut reviews: Vec<Review> = self
            .lock()
            .reviews
            .iter()
            .filter(|r| r.item_id == item)
            .cloned()
            .collect();
        newest_first(&mut reviews, |r| (r.created_at, r.id.as_i64()));
        Ok(reviews)
    }

    async fn create_review(&self, review: &NewReview) -> Result<(), PlatformError> {
        let mut inner = self.lock();
        inner.check_writable()?;
        let id = ReviewId::new(inner.next_id());
        inner.reviews.push(Review {
            id,
            item_id: review.item_id,
            name: review.name.clone(),
            email: review.email.as_ref().map(ToString::to_string),
            message: review.message.clone(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn create_contact(&self, message: &ContactMessage) -> Result<(), PlatformError> {
        let mut inner = self.lock();
        inner.check_writable()?;
        inner.contacts.push(message.clone());
        Ok(())
    }

    async fn profile(&self, user: UserId) -> Result<Option<Profile>, PlatformError> {
        Ok(self.lock().profiles.get(&user).cloned())
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<(), PlatformError> {
        let mut inner = self.lock();
        inner.check_writable()?;
        inner.profiles.insert(profile.id, profile.clone());
        Ok(())
    }

    async fn ping(&self) -> Result<(), PlatformError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[tokio::test]
    async fn test_cart_is_scoped_to_user() {
        let platform = MemoryPlatform::new();
        let dosa = platform.add_menu_item("Ragi Dosa", Decimal::new(90, 0), "breakfast");
        let asha = platform.add_user("asha@example.in", "pw", None);
        let ravi = platform.add_user("ravi@example.in", "pw", None);

        platform.insert_cart_line(asha, dosa.id, 2).await.unwrap();
        platform.insert_cart_line(ravi, dosa.id, 1).await.unwrap();
        platform.clear_cart(asha).await.unwrap();

        assert!(platform.cart_lines(asha).await.unwrap().is_empty());
        let ravi_cart = platform.cart_lines(ravi).await.unwrap();
        assert_eq!(ravi_cart.len(), 1);
        assert_eq!(ravi_cart[0].item.as_ref().unwrap().name, "Ragi Dosa");
    }

    #[tokio::test]
    async fn test_tokens_resolve_until_revoked() {
        let platform = MemoryPlatform::new();
        platform.add_user("asha@example.in", "pw", Some(Role::Admin));
        let email = Email::parse("asha@example.in").unwrap();

        let session = platform
            .sign_in(&email, &SecretString::from("pw"))
            .await
            .unwrap();
        assert!(platform.current_user(&session.access_token).await.is_ok());

        platform.revoke_all_tokens();
        let err = platform.current_user(&session.access_token).await.unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_wrong_password_is_rejected() {
        let platform = MemoryPlatform::new();
        platform.add_user("asha@example.in", "pw", None);
        let email = Email::parse("asha@example.in").unwrap();

        let err = platform
            .sign_in(&email, &SecretString::from("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, PlatformError::InvalidCredentials));
    }
}
