use std::time::Duration;

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tavola_types::api::{RemoteMenuItem, RemoteReservation};
use tracing::debug;

use crate::{RemoteResult, check, endpoint, http_client};

/// Client for the restaurant REST service (`api/menu`, `api/reservations`).
#[derive(Clone)]
pub struct RestaurantClient {
    http: Client,
    base: Url,
}

impl RestaurantClient {
    pub fn new(base_url: &str, timeout: Duration) -> RemoteResult<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            base: Url::parse(base_url)?,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> RemoteResult<T> {
        let url = endpoint(&self.base, segments)?;
        debug!(%url, "rest: GET");
        let response = check(self.http.get(url).send().await?).await?;
        Ok(response.json().await?)
    }

    async fn delete(&self, segments: &[&str]) -> RemoteResult<()> {
        let url = endpoint(&self.base, segments)?;
        debug!(%url, "rest: DELETE");
        check(self.http.delete(url).send().await?).await?;
        Ok(())
    }

    // -- Menu --

    pub async fn list_menu(&self) -> RemoteResult<Vec<RemoteMenuItem>> {
        self.get_json(&["api", "menu"]).await
    }

    pub async fn get_menu_item(&self, id: i64) -> RemoteResult<RemoteMenuItem> {
        self.get_json(&["api", "menu", id.to_string().as_str()]).await
    }

    pub async fn create_menu_item(&self, item: &RemoteMenuItem) -> RemoteResult<RemoteMenuItem> {
        let url = endpoint(&self.base, &["api", "menu"])?;
        debug!(%url, name = %item.name, "rest: create menu item");
        let response = check(self.http.post(url).json(item).send().await?).await?;
        Ok(response.json().await?)
    }

    pub async fn update_menu_item(&self, id: i64, item: &RemoteMenuItem) -> RemoteResult<RemoteMenuItem> {
        let url = endpoint(&self.base, &["api", "menu", id.to_string().as_str()])?;
        debug!(%url, "rest: update menu item");
        let response = check(self.http.put(url).json(item).send().await?).await?;
        Ok(response.json().await?)
    }

    pub async fn delete_menu_item(&self, id: i64) -> RemoteResult<()> {
        self.delete(&["api", "menu", id.to_string().as_str()]).await
    }

    // -- Reservations --

    pub async fn list_reservations(&self) -> RemoteResult<Vec<RemoteReservation>> {
        self.get_json(&["api", "reservations"]).await
    }

    pub async fn list_reservations_for_user(&self, user_id: i64) -> RemoteResult<Vec<RemoteReservation>> {
        self.get_json(&["api", "reservations", "user", user_id.to_string().as_str()]).await
    }

    pub async fn get_reservation(&self, id: i64) -> RemoteResult<RemoteReservation> {
        self.get_json(&["api", "reservations", id.to_string().as_str()]).await
    }

    pub async fn create_reservation(&self, reservation: &RemoteReservation) -> RemoteResult<RemoteReservation> {
        let url = endpoint(&self.base, &["api", "reservations"])?;
        debug!(%url, user_id = reservation.user_id, "rest: create reservation");
        let response = check(self.http.post(url).json(reservation).send().await?).await?;
        Ok(response.json().await?)
    }

    pub async fn update_reservation(&self, id: i64, reservation: &RemoteReservation) -> RemoteResult<RemoteReservation> {
        let url = endpoint(&self.base, &["api", "reservations", id.to_string().as_str()])?;
        debug!(%url, "rest: update reservation");
        let response = check(self.http.put(url).json(reservation).send().await?).await?;
        Ok(response.json().await?)
    }

    /// The service models cancellation as DELETE on the reservation.
    pub async fn cancel_reservation(&self, id: i64) -> RemoteResult<()> {
        self.delete(&["api", "reservations", id.to_string().as_str()]).await
    }
}
