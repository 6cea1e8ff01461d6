//! Order lifecycle: bulk creation, assignment and status transitions.

use chrono::NaiveDate;
use diesel::{dsl::count_star, insert_into, prelude::*, update};
use diesel_async::{scoped_futures::ScopedFutureExt, AsyncConnection, AsyncPgConnection, RunQueryDsl};
use serde::Serialize;
use tracing::{debug, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ServiceError;
use crate::lifecycle::{consume_meal, StatusTransition};
use crate::models::{
    CustomerContact, Delivery, DeliveryStatus, MealType, NewDelivery, StaffContact,
};
use crate::schema::{attendances, customers, deliveries, users};

use super::CustomerStore;

/// Optional criteria for delivery listings. Unset fields do not filter.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DeliveryFilter {
    pub delivery_person_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub delivery_date: Option<NaiveDate>,
    pub status: Option<DeliveryStatus>,
}

impl DeliveryFilter {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A delivery together with the display fields of its customer and worker.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct DeliveryDetails {
    #[serde(flatten)]
    pub delivery: Delivery,
    pub customer: CustomerContact,
    pub delivery_person: Option<StaffContact>,
}

/// Outcome of a status transition.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct StatusChange {
    pub delivery_id: Uuid,
    pub previous_status: DeliveryStatus,
    pub status: DeliveryStatus,
    /// Customer's remaining meals when this transition consumed one.
    pub remaining_meals: Option<i32>,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct DashboardSummary {
    pub total_customers: i64,
    pub today_deliveries: i64,
    pub today_attendance: i64,
    pub pending_deliveries: i64,
}

/// Rows per INSERT. Each delivery binds five parameters and Postgres caps a
/// statement at 65535.
const INSERT_CHUNK: usize = 10_000;

pub struct DeliveryStore<'a> {
    conn: &'a mut AsyncPgConnection,
}

impl<'a> DeliveryStore<'a> {
    pub fn new(conn: &'a mut AsyncPgConnection) -> Self {
        Self { conn }
    }

    /// Creates one pending delivery for every customer subscribed to `meal_type`.
    ///
    /// Deliveries that already exist for (customer, date, meal) are skipped,
    /// so the returned list holds only the rows created by this call.
    pub async fn create_for_meal(
        &mut self,
        meal_type: MealType,
        delivery_date: NaiveDate,
    ) -> Result<Vec<Delivery>, ServiceError> {
        let subscribers = customers::table
            .filter(customers::meals_timing.contains(vec![meal_type.as_str().to_string()]))
            .select(customers::id)
            .load::<Uuid>(self.conn)
            .await?;

        if subscribers.is_empty() {
            return Err(ServiceError::NotFound(
                "No customers found with the specified meal type".to_string(),
            ));
        }

        let subscribers_count = subscribers.len();
        let rows = subscribers
            .into_iter()
            .map(|customer_id| NewDelivery::pending(customer_id, meal_type, delivery_date))
            .collect::<Vec<_>>();

        let created = self
            .conn
            .transaction::<_, ServiceError, _>(|conn| {
                async move {
                    let mut created = Vec::new();
                    for chunk in rows.chunks(INSERT_CHUNK) {
                        let inserted: Vec<Delivery> = insert_into(deliveries::table)
                            .values(chunk)
                            .on_conflict((
                                deliveries::customer_id,
                                deliveries::delivery_date,
                                deliveries::meal_type,
                            ))
                            .do_nothing()
                            .returning(Delivery::as_returning())
                            .get_results(conn)
                            .await?;
                        created.extend(inserted);
                    }
                    Ok(created)
                }
                .scope_boxed()
            })
            .await?;

        info!(
            meal_type = %meal_type,
            %delivery_date,
            subscribers = subscribers_count,
            created = created.len(),
            "deliveries created"
        );
        Ok(created)
    }

    /// Assigns every delivery in `delivery_ids` to `delivery_person_id` and
    /// forces their status to assigned. Nothing is written when any id is unknown.
    pub async fn assign(
        &mut self,
        delivery_ids: &[Uuid],
        delivery_person_id: Uuid,
    ) -> Result<Vec<Delivery>, ServiceError> {
        let delivery_ids = delivery_ids.to_vec();

        let assigned = self
            .conn
            .transaction::<_, ServiceError, _>(|conn| {
                async move {
                    let person = users::table
                        .find(delivery_person_id)
                        .select(users::id)
                        .first::<Uuid>(conn)
                        .await
                        .optional()?;
                    if person.is_none() {
                        return Err(ServiceError::not_found("Delivery person"));
                    }

                    let assigned = update(deliveries::table)
                        .filter(deliveries::id.eq_any(&delivery_ids))
                        .set((
                            deliveries::delivery_person_id.eq(Some(delivery_person_id)),
                            deliveries::status.eq(DeliveryStatus::Assigned),
                        ))
                        .returning(Delivery::as_returning())
                        .get_results(conn)
                        .await?;

                    if assigned.len() != delivery_ids.len() {
                        return Err(ServiceError::not_found("Delivery"));
                    }
                    Ok(assigned)
                }
                .scope_boxed()
            })
            .await?;

        info!(
            %delivery_person_id,
            count = assigned.len(),
            "deliveries assigned"
        );
        Ok(assigned)
    }

    /// Moves a delivery to `next`, consuming one meal from the customer when
    /// the delivery enters delivered. Status and credit commit together; a
    /// refused decrement leaves both untouched.
    pub async fn transition_status(
        &mut self,
        delivery_id: Uuid,
        customer_id: Uuid,
        next: DeliveryStatus,
    ) -> Result<StatusChange, ServiceError> {
        let change = self
            .conn
            .transaction::<_, ServiceError, _>(|conn| {
                async move {
                    let delivery = deliveries::table
                        .find(delivery_id)
                        .select(Delivery::as_select())
                        .for_update()
                        .first(conn)
                        .await
                        .optional()?
                        .ok_or_else(|| ServiceError::not_found("Delivery"))?;

                    if delivery.customer_id != customer_id {
                        return Err(ServiceError::invalid(
                            "customer_id does not match the delivery",
                        ));
                    }

                    let transition = StatusTransition::new(delivery.status, next);
                    let remaining_meals = if transition.consumes_meal() {
                        let meals = customers::table
                            .find(delivery.customer_id)
                            .select(customers::meals)
                            .for_update()
                            .first::<i32>(conn)
                            .await
                            .optional()?
                            .ok_or_else(|| ServiceError::not_found("Customer"))?;
                        let remaining = consume_meal(meals)?;

                        update(customers::table.find(delivery.customer_id))
                            .set(customers::meals.eq(remaining))
                            .execute(conn)
                            .await?;
                        Some(remaining)
                    } else {
                        None
                    };

                    update(deliveries::table.find(delivery.id))
                        .set(deliveries::status.eq(next))
                        .execute(conn)
                        .await?;

                    Ok(StatusChange {
                        delivery_id: delivery.id,
                        previous_status: transition.previous,
                        status: transition.next,
                        remaining_meals,
                    })
                }
                .scope_boxed()
            })
            .await?;

        match change.remaining_meals {
            Some(remaining) => info!(
                %delivery_id,
                %customer_id,
                remaining_meals = remaining,
                "delivery completed, meal consumed"
            ),
            None => debug!(
                %delivery_id,
                previous = %change.previous_status,
                status = %change.status,
                "delivery status updated"
            ),
        }
        Ok(change)
    }

    /// Marks a delivery delivered on behalf of its own customer.
    pub async fn complete(&mut self, delivery_id: Uuid) -> Result<StatusChange, ServiceError> {
        let customer_id = deliveries::table
            .find(delivery_id)
            .select(deliveries::customer_id)
            .first::<Uuid>(self.conn)
            .await
            .optional()?
            .ok_or_else(|| ServiceError::not_found("Delivery"))?;

        self.transition_status(delivery_id, customer_id, DeliveryStatus::Delivered)
            .await
    }

    pub async fn list(&mut self) -> Result<Vec<Delivery>, ServiceError> {
        Ok(deliveries::table
            .select(Delivery::as_select())
            .order((deliveries::delivery_date.asc(), deliveries::created_at.asc()))
            .load(self.conn)
            .await?)
    }

    pub async fn find(&mut self, filter: &DeliveryFilter) -> Result<Vec<Delivery>, ServiceError> {
        let mut query = deliveries::table.select(Delivery::as_select()).into_boxed();

        if let Some(person) = filter.delivery_person_id {
            query = query.filter(deliveries::delivery_person_id.eq(person));
        }
        if let Some(customer) = filter.customer_id {
            query = query.filter(deliveries::customer_id.eq(customer));
        }
        if let Some(date) = filter.delivery_date {
            query = query.filter(deliveries::delivery_date.eq(date));
        }
        if let Some(status) = filter.status {
            query = query.filter(deliveries::status.eq(status));
        }

        Ok(query
            .order((deliveries::delivery_date.asc(), deliveries::created_at.asc()))
            .load(self.conn)
            .await?)
    }

    /// Like [`DeliveryStore::find`], with customer and worker display fields attached.
    pub async fn find_details(
        &mut self,
        filter: &DeliveryFilter,
    ) -> Result<Vec<DeliveryDetails>, ServiceError> {
        let mut query = deliveries::table
            .inner_join(customers::table)
            .left_join(users::table)
            .select((
                Delivery::as_select(),
                CustomerContact::as_select(),
                Option::<StaffContact>::as_select(),
            ))
            .into_boxed();

        if let Some(person) = filter.delivery_person_id {
            query = query.filter(deliveries::delivery_person_id.eq(person));
        }
        if let Some(customer) = filter.customer_id {
            query = query.filter(deliveries::customer_id.eq(customer));
        }
        if let Some(date) = filter.delivery_date {
            query = query.filter(deliveries::delivery_date.eq(date));
        }
        if let Some(status) = filter.status {
            query = query.filter(deliveries::status.eq(status));
        }

        let rows = query
            .order((deliveries::delivery_date.asc(), deliveries::created_at.asc()))
            .load::<(Delivery, CustomerContact, Option<StaffContact>)>(self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(delivery, customer, delivery_person)| DeliveryDetails {
                delivery,
                customer,
                delivery_person,
            })
            .collect())
    }

    /// Today's assigned deliveries of the worker registered under `email`.
    pub async fn worker_orders(
        &mut self,
        email: &str,
        today: NaiveDate,
    ) -> Result<Vec<DeliveryDetails>, ServiceError> {
        let worker = users::table
            .filter(users::email.eq(email))
            .select(users::id)
            .first::<Uuid>(self.conn)
            .await
            .optional()?
            .ok_or_else(|| ServiceError::not_found("User"))?;

        let orders = self
            .find_details(&DeliveryFilter {
                delivery_person_id: Some(worker),
                delivery_date: Some(today),
                status: Some(DeliveryStatus::Assigned),
                ..Default::default()
            })
            .await?;

        if orders.is_empty() {
            return Err(ServiceError::NotFound(
                "No orders found for this user".to_string(),
            ));
        }
        Ok(orders)
    }

    pub async fn dashboard(&mut self, today: NaiveDate) -> Result<DashboardSummary, ServiceError> {
        let total_customers = CustomerStore::new(self.conn).count().await?;
        let today_deliveries = deliveries::table
            .filter(deliveries::delivery_date.eq(today))
            .select(count_star())
            .get_result::<i64>(self.conn)
            .await?;
        let today_attendance = attendances::table
            .filter(attendances::date.eq(today))
            .select(count_star())
            .get_result::<i64>(self.conn)
            .await?;
        let pending_deliveries = deliveries::table
            .filter(deliveries::status.eq(DeliveryStatus::Pending))
            .select(count_star())
            .get_result::<i64>(self.conn)
            .await?;

        Ok(DashboardSummary {
            total_customers,
            today_deliveries,
            today_attendance,
            pending_deliveries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_chunk_fits_postgres_bind_limit() {
        // id, customer_id, delivery_date, meal_type, status
        let binds_per_row = 5;
        assert!(INSERT_CHUNK * binds_per_row <= u16::MAX as usize);
    }
}
