use chrono::NaiveDate;
use diesel::{delete, dsl::count_star, insert_into, prelude::*, update};
use diesel_async::{scoped_futures::ScopedFutureExt, AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::info;
use uuid::Uuid;

use crate::error::ServiceError;
use crate::models::{Customer, CustomerChangeset, MealType, NewCustomer, PaymentStatus};
use crate::schema::customers;

use super::map_unique_violation;

#[derive(Debug, Clone)]
pub struct NewCustomerInput {
    pub name: String,
    pub email: String,
    pub contact: String,
    pub address: String,
    pub subscription: String,
    pub subscription_start_date: NaiveDate,
    pub subscription_end_date: NaiveDate,
    pub meals: i32,
    pub meals_timing: Vec<MealType>,
    pub payment: PaymentStatus,
}

#[derive(Debug, Default, Clone)]
pub struct CustomerFilter {
    pub id: Option<Uuid>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub subscription: Option<String>,
    pub subscription_start_date: Option<NaiveDate>,
    pub subscription_end_date: Option<NaiveDate>,
}

/// A subscription must not end before it starts.
fn check_subscription_window(start: NaiveDate, end: NaiveDate) -> Result<(), ServiceError> {
    if end < start {
        return Err(ServiceError::invalid(
            "Subscription end date must not precede the start date",
        ));
    }
    Ok(())
}

pub struct CustomerStore<'a> {
    conn: &'a mut AsyncPgConnection,
}

impl<'a> CustomerStore<'a> {
    pub fn new(conn: &'a mut AsyncPgConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&mut self, input: NewCustomerInput) -> Result<Customer, ServiceError> {
        if input.meals < 0 {
            return Err(ServiceError::invalid("Meals must not be negative"));
        }
        check_subscription_window(input.subscription_start_date, input.subscription_end_date)?;

        let existing = customers::table
            .filter(customers::email.eq(&input.email))
            .select(customers::id)
            .first::<Uuid>(self.conn)
            .await
            .optional()?;
        if existing.is_some() {
            return Err(ServiceError::AlreadyExists("Customer"));
        }

        let customer = NewCustomer {
            id: Uuid::new_v4(),
            name: input.name,
            email: input.email,
            contact: input.contact,
            address: input.address,
            subscription: input.subscription,
            subscription_start_date: input.subscription_start_date,
            subscription_end_date: input.subscription_end_date,
            meals: input.meals,
            meals_timing: input
                .meals_timing
                .iter()
                .map(|slot| slot.as_str().to_string())
                .collect(),
            payment: input.payment,
        };

        let created = insert_into(customers::table)
            .values(&customer)
            .returning(Customer::as_returning())
            .get_result(self.conn)
            .await
            .map_err(map_unique_violation("Customer"))?;

        info!(customer_id = %created.id, meals = created.meals, "customer added");
        Ok(created)
    }

    pub async fn list(&mut self) -> Result<Vec<Customer>, ServiceError> {
        Ok(customers::table
            .select(Customer::as_select())
            .order(customers::created_at.asc())
            .load(self.conn)
            .await?)
    }

    pub async fn find(&mut self, id: Uuid) -> Result<Customer, ServiceError> {
        customers::table
            .find(id)
            .select(Customer::as_select())
            .first(self.conn)
            .await
            .optional()?
            .ok_or_else(|| ServiceError::not_found("Customer"))
    }

    pub async fn filter(&mut self, filter: &CustomerFilter) -> Result<Vec<Customer>, ServiceError> {
        let mut query = customers::table.select(Customer::as_select()).into_boxed();

        if let Some(id) = filter.id {
            query = query.filter(customers::id.eq(id));
        }
        if let Some(name) = &filter.name {
            query = query.filter(customers::name.eq(name.clone()));
        }
        if let Some(email) = &filter.email {
            query = query.filter(customers::email.eq(email.clone()));
        }
        if let Some(contact) = &filter.contact {
            query = query.filter(customers::contact.eq(contact.clone()));
        }
        if let Some(address) = &filter.address {
            query = query.filter(customers::address.eq(address.clone()));
        }
        if let Some(subscription) = &filter.subscription {
            query = query.filter(customers::subscription.eq(subscription.clone()));
        }
        if let Some(start) = filter.subscription_start_date {
            query = query.filter(customers::subscription_start_date.eq(start));
        }
        if let Some(end) = filter.subscription_end_date {
            query = query.filter(customers::subscription_end_date.eq(end));
        }

        Ok(query
            .order(customers::created_at.asc())
            .load(self.conn)
            .await?)
    }

    pub async fn update(
        &mut self,
        id: Uuid,
        changes: CustomerChangeset,
    ) -> Result<Customer, ServiceError> {
        if changes.meals.is_some_and(|meals| meals < 0) {
            return Err(ServiceError::invalid("Meals must not be negative"));
        }
        if changes.is_empty() {
            return self.find(id).await;
        }

        let updated = self
            .conn
            .transaction::<_, ServiceError, _>(|conn| {
                async move {
                    // A partial change is checked against the stored other end.
                    if changes.subscription_start_date.is_some()
                        || changes.subscription_end_date.is_some()
                    {
                        let (start, end) = customers::table
                            .find(id)
                            .select((
                                customers::subscription_start_date,
                                customers::subscription_end_date,
                            ))
                            .for_update()
                            .first::<(NaiveDate, NaiveDate)>(conn)
                            .await
                            .optional()?
                            .ok_or_else(|| ServiceError::not_found("Customer"))?;
                        check_subscription_window(
                            changes.subscription_start_date.unwrap_or(start),
                            changes.subscription_end_date.unwrap_or(end),
                        )?;
                    }

                    update(customers::table.find(id))
                        .set(&changes)
                        .returning(Customer::as_returning())
                        .get_result(conn)
                        .await
                        .optional()
                        .map_err(map_unique_violation("Customer"))?
                        .ok_or_else(|| ServiceError::not_found("Customer"))
                }
                .scope_boxed()
            })
            .await?;

        info!(customer_id = %updated.id, "customer updated");
        Ok(updated)
    }

    pub async fn remove(&mut self, id: Uuid) -> Result<(), ServiceError> {
        let removed = delete(customers::table.find(id)).execute(self.conn).await?;
        if removed == 0 {
            return Err(ServiceError::not_found("Customer"));
        }
        info!(customer_id = %id, "customer removed");
        Ok(())
    }

    pub async fn count(&mut self) -> Result<i64, ServiceError> {
        Ok(customers::table
            .select(count_star())
            .get_result(self.conn)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_window_allows_a_single_day() {
        let day = NaiveDate::from_ymd_opt(2031, 3, 1).unwrap();
        assert!(check_subscription_window(day, day).is_ok());
        assert!(check_subscription_window(day, day.succ_opt().unwrap()).is_ok());
    }

    #[test]
    fn subscription_window_rejects_end_before_start() {
        let day = NaiveDate::from_ymd_opt(2031, 3, 2).unwrap();
        let err = check_subscription_window(day, day.pred_opt().unwrap()).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));
    }
}
