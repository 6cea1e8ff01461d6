//! Store tests against a live Postgres at `DATABASE_URL`.
//!
//! Run with `cargo test -p tiffin-service -- --ignored`.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use diesel::prelude::*;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tiffin_service::models::{
    AttendanceStatus, Customer, CustomerChangeset, DeliveryStatus, MealType, PaymentStatus, Role,
    User,
};
use tiffin_service::schema::{customers, deliveries};
use tiffin_service::store::{
    AttendanceMark, AttendanceStore, CustomerStore, DeliveryStore, NewCustomerInput,
    NewStaffInput, StaffStore,
};
use tiffin_service::{establish_connection, run_migrations, ServiceError};
use tokio::sync::OnceCell;
use uuid::Uuid;

static MIGRATED: OnceCell<()> = OnceCell::const_new();

// 테스트마다 고유한 이메일을 쓰므로 테이블을 비우지 않고 마이그레이션만 적용한다
async fn setup_database() -> AsyncPgConnection {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    MIGRATED
        .get_or_init(|| async {
            run_migrations(&database_url).await.unwrap();
        })
        .await;
    establish_connection(&database_url).await.unwrap()
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2031, 3, day).unwrap()
}

async fn add_customer(conn: &mut AsyncPgConnection, meals: i32, slots: Vec<MealType>) -> Customer {
    CustomerStore::new(conn)
        .create(NewCustomerInput {
            name: "Asha".to_string(),
            email: format!("{}@tiffin.test", Uuid::new_v4()),
            contact: "9800000000".to_string(),
            address: "12 Station Road".to_string(),
            subscription: "monthly".to_string(),
            subscription_start_date: date(1),
            subscription_end_date: date(31),
            meals,
            meals_timing: slots,
            payment: PaymentStatus::Done,
        })
        .await
        .unwrap()
}

async fn add_worker(conn: &mut AsyncPgConnection) -> User {
    StaffStore::new(conn)
        .register(NewStaffInput {
            name: "Ravi".to_string(),
            email: format!("{}@tiffin.test", Uuid::new_v4()),
            passphrase: "ravi-pass".to_string(),
            contact: "9811111111".to_string(),
            total_salary: BigDecimal::from(12000),
            role: Role::Staff,
        })
        .await
        .unwrap()
}

async fn meals_of(conn: &mut AsyncPgConnection, customer_id: Uuid) -> i32 {
    customers::table
        .find(customer_id)
        .select(customers::meals)
        .first(conn)
        .await
        .unwrap()
}

async fn delivery_for(
    conn: &mut AsyncPgConnection,
    customer_id: Uuid,
    day: NaiveDate,
    meal_type: MealType,
) -> tiffin_service::models::Delivery {
    deliveries::table
        .filter(deliveries::customer_id.eq(customer_id))
        .filter(deliveries::delivery_date.eq(day))
        .filter(deliveries::meal_type.eq(meal_type))
        .select(tiffin_service::models::Delivery::as_select())
        .first(conn)
        .await
        .unwrap()
}

#[tokio::test]
#[ignore]
async fn test_create_for_meal_is_idempotent() {
    let conn = &mut setup_database().await;
    let customer = add_customer(conn, 5, vec![MealType::Lunch, MealType::Dinner]).await;
    let day = date(4);

    let first = DeliveryStore::new(conn)
        .create_for_meal(MealType::Lunch, day)
        .await
        .unwrap();
    assert!(first.iter().any(|d| d.customer_id == customer.id));
    assert!(first.iter().all(|d| d.status == DeliveryStatus::Pending));

    // 같은 날짜와 식사로 다시 생성하면 새로 만들어지는 배달이 없어야 한다
    let second = DeliveryStore::new(conn)
        .create_for_meal(MealType::Lunch, day)
        .await
        .unwrap();
    assert!(second.iter().all(|d| d.customer_id != customer.id));

    let count = deliveries::table
        .filter(deliveries::customer_id.eq(customer.id))
        .filter(deliveries::delivery_date.eq(day))
        .count()
        .get_result::<i64>(conn)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
#[ignore]
async fn test_assign_forces_assigned_status() {
    let conn = &mut setup_database().await;
    let customer = add_customer(conn, 5, vec![MealType::Breakfast]).await;
    let worker = add_worker(conn).await;
    let day = date(5);

    DeliveryStore::new(conn)
        .create_for_meal(MealType::Breakfast, day)
        .await
        .unwrap();
    let delivery = delivery_for(conn, customer.id, day, MealType::Breakfast).await;
    DeliveryStore::new(conn)
        .transition_status(delivery.id, customer.id, DeliveryStatus::Cancelled)
        .await
        .unwrap();

    let assigned = DeliveryStore::new(conn)
        .assign(&[delivery.id], worker.id)
        .await
        .unwrap();

    assert_eq!(assigned.len(), 1);
    assert_eq!(assigned[0].status, DeliveryStatus::Assigned);
    assert_eq!(assigned[0].delivery_person_id, Some(worker.id));
}

#[tokio::test]
#[ignore]
async fn test_assign_rolls_back_on_unknown_delivery() {
    let conn = &mut setup_database().await;
    let customer = add_customer(conn, 5, vec![MealType::Dinner]).await;
    let worker = add_worker(conn).await;
    let day = date(6);

    DeliveryStore::new(conn)
        .create_for_meal(MealType::Dinner, day)
        .await
        .unwrap();
    let delivery = delivery_for(conn, customer.id, day, MealType::Dinner).await;

    let result = DeliveryStore::new(conn)
        .assign(&[delivery.id, Uuid::new_v4()], worker.id)
        .await;
    assert!(matches!(result, Err(ServiceError::NotFound(_))));

    let untouched = delivery_for(conn, customer.id, day, MealType::Dinner).await;
    assert_eq!(untouched.status, DeliveryStatus::Pending);
    assert_eq!(untouched.delivery_person_id, None);
}

#[tokio::test]
#[ignore]
async fn test_meal_credit_lifecycle() {
    let conn = &mut setup_database().await;
    let customer = add_customer(conn, 3, vec![MealType::Lunch]).await;
    let day = date(7);

    DeliveryStore::new(conn)
        .create_for_meal(MealType::Lunch, day)
        .await
        .unwrap();
    let delivery = delivery_for(conn, customer.id, day, MealType::Lunch).await;

    let steps = [
        (DeliveryStatus::Delivered, 2),
        (DeliveryStatus::Delivered, 2),
        (DeliveryStatus::Pending, 2),
        (DeliveryStatus::Delivered, 1),
    ];
    for (status, expected) in steps {
        DeliveryStore::new(conn)
            .transition_status(delivery.id, customer.id, status)
            .await
            .unwrap();
        assert_eq!(meals_of(conn, customer.id).await, expected);
    }
}

#[tokio::test]
#[ignore]
async fn test_exhausted_credit_leaves_no_mutation() {
    let conn = &mut setup_database().await;
    let customer = add_customer(conn, 0, vec![MealType::Dinner]).await;
    let day = date(8);

    DeliveryStore::new(conn)
        .create_for_meal(MealType::Dinner, day)
        .await
        .unwrap();
    let delivery = delivery_for(conn, customer.id, day, MealType::Dinner).await;

    let result = DeliveryStore::new(conn)
        .transition_status(delivery.id, customer.id, DeliveryStatus::Delivered)
        .await;
    assert!(matches!(result, Err(ServiceError::CreditExhausted)));

    let unchanged = delivery_for(conn, customer.id, day, MealType::Dinner).await;
    assert_eq!(unchanged.status, DeliveryStatus::Pending);
    assert_eq!(meals_of(conn, customer.id).await, 0);
}

#[tokio::test]
#[ignore]
async fn test_transition_rejects_foreign_customer() {
    let conn = &mut setup_database().await;
    let customer = add_customer(conn, 2, vec![MealType::Breakfast]).await;
    let other = add_customer(conn, 2, vec![]).await;
    let day = date(9);

    DeliveryStore::new(conn)
        .create_for_meal(MealType::Breakfast, day)
        .await
        .unwrap();
    let delivery = delivery_for(conn, customer.id, day, MealType::Breakfast).await;

    let result = DeliveryStore::new(conn)
        .transition_status(delivery.id, other.id, DeliveryStatus::Delivered)
        .await;
    assert!(matches!(result, Err(ServiceError::InvalidArgument(_))));
    assert_eq!(meals_of(conn, customer.id).await, 2);
}

#[tokio::test]
#[ignore]
async fn test_attendance_upsert() {
    let conn = &mut setup_database().await;
    let worker = add_worker(conn).await;
    let day = date(10);

    let created = AttendanceStore::new(conn)
        .mark(worker.id, day, AttendanceStatus::Present)
        .await
        .unwrap();
    assert!(matches!(created, AttendanceMark::Created(_)));

    let duplicate = AttendanceStore::new(conn)
        .mark(worker.id, day, AttendanceStatus::Present)
        .await;
    assert!(matches!(duplicate, Err(ServiceError::DuplicateAttendance)));

    let updated = AttendanceStore::new(conn)
        .mark(worker.id, day, AttendanceStatus::Absent)
        .await
        .unwrap();
    match updated {
        AttendanceMark::Updated(attendance) => {
            assert_eq!(attendance.status, AttendanceStatus::Absent)
        }
        other => panic!("expected update, got {other:?}"),
    }

    let missing = AttendanceStore::new(conn)
        .staff_without_attendance(day)
        .await
        .unwrap();
    assert!(missing.iter().all(|user| user.id != worker.id));
}

#[tokio::test]
#[ignore]
async fn test_authenticate() {
    let conn = &mut setup_database().await;
    let worker = add_worker(conn).await;

    let user = StaffStore::new(conn)
        .authenticate(&worker.email, "ravi-pass")
        .await
        .unwrap();
    assert_eq!(user.id, worker.id);

    let rejected = StaffStore::new(conn)
        .authenticate(&worker.email, "wrong")
        .await;
    assert!(matches!(rejected, Err(ServiceError::InvalidCredentials)));
}

#[tokio::test]
#[ignore]
async fn test_duplicate_customer_email() {
    let conn = &mut setup_database().await;
    let customer = add_customer(conn, 3, vec![MealType::Lunch]).await;

    let duplicate = CustomerStore::new(conn)
        .create(NewCustomerInput {
            name: "Asha Two".to_string(),
            email: customer.email.clone(),
            contact: "9800000001".to_string(),
            address: "14 Station Road".to_string(),
            subscription: "weekly".to_string(),
            subscription_start_date: date(1),
            subscription_end_date: date(7),
            meals: 7,
            meals_timing: vec![MealType::Dinner],
            payment: PaymentStatus::Pending,
        })
        .await;
    assert!(matches!(duplicate, Err(ServiceError::AlreadyExists(_))));
}

#[tokio::test]
#[ignore]
async fn test_worker_orders_lists_assigned_deliveries_of_the_day() {
    let conn = &mut setup_database().await;
    let customer = add_customer(conn, 4, vec![MealType::Lunch]).await;
    let worker = add_worker(conn).await;
    let day = date(20);

    // 배정 전에는 주문이 없다
    let none = DeliveryStore::new(conn).worker_orders(&worker.email, day).await;
    assert!(matches!(none, Err(ServiceError::NotFound(_))));

    DeliveryStore::new(conn)
        .create_for_meal(MealType::Lunch, day)
        .await
        .unwrap();
    let delivery = delivery_for(conn, customer.id, day, MealType::Lunch).await;
    DeliveryStore::new(conn)
        .assign(&[delivery.id], worker.id)
        .await
        .unwrap();

    let orders = DeliveryStore::new(conn)
        .worker_orders(&worker.email, day)
        .await
        .unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].delivery.id, delivery.id);
    assert_eq!(orders[0].customer.name, customer.name);

    let summary = DeliveryStore::new(conn).dashboard(day).await.unwrap();
    assert!(summary.total_customers >= 1);
    assert!(summary.today_deliveries >= 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_concurrent_delivered_calls_consume_one_meal() {
    let conn = &mut setup_database().await;
    let customer = add_customer(conn, 5, vec![MealType::Dinner]).await;
    let day = date(22);

    DeliveryStore::new(conn)
        .create_for_meal(MealType::Dinner, day)
        .await
        .unwrap();
    let delivery = delivery_for(conn, customer.id, day, MealType::Dinner).await;

    // 각 작업은 자기 커넥션으로 같은 배달을 동시에 delivered로 옮긴다
    let handles = (0..8)
        .map(|_| {
            let (delivery_id, customer_id) = (delivery.id, customer.id);
            tokio::spawn(async move {
                let mut conn = setup_database().await;
                DeliveryStore::new(&mut conn)
                    .transition_status(delivery_id, customer_id, DeliveryStatus::Delivered)
                    .await
            })
        })
        .collect::<Vec<_>>();

    let mut consumed = 0;
    for handle in handles {
        let change = handle.await.unwrap().unwrap();
        assert_eq!(change.status, DeliveryStatus::Delivered);
        if change.remaining_meals.is_some() {
            consumed += 1;
        }
    }

    assert_eq!(consumed, 1);
    assert_eq!(meals_of(conn, customer.id).await, 4);
}

#[tokio::test]
#[ignore]
async fn test_complete_consumes_a_meal_once() {
    let conn = &mut setup_database().await;
    let customer = add_customer(conn, 1, vec![MealType::Breakfast]).await;
    let day = date(23);

    DeliveryStore::new(conn)
        .create_for_meal(MealType::Breakfast, day)
        .await
        .unwrap();
    let delivery = delivery_for(conn, customer.id, day, MealType::Breakfast).await;

    let first = DeliveryStore::new(conn).complete(delivery.id).await.unwrap();
    assert_eq!(first.status, DeliveryStatus::Delivered);
    assert_eq!(first.remaining_meals, Some(0));

    let second = DeliveryStore::new(conn).complete(delivery.id).await.unwrap();
    assert_eq!(second.previous_status, DeliveryStatus::Delivered);
    assert_eq!(second.remaining_meals, None);
    assert_eq!(meals_of(conn, customer.id).await, 0);

    let unknown = DeliveryStore::new(conn).complete(Uuid::new_v4()).await;
    assert!(matches!(unknown, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
#[ignore]
async fn test_create_for_meal_without_subscribers() {
    let conn = &mut setup_database().await;
    // 롤백되는 트랜잭션 안에서 고객을 모두 지운다
    conn.begin_test_transaction().await.unwrap();
    diesel::delete(customers::table).execute(conn).await.unwrap();

    let result = DeliveryStore::new(conn)
        .create_for_meal(MealType::Lunch, date(24))
        .await;
    assert!(matches!(result, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
#[ignore]
async fn test_update_keeps_subscription_window() {
    let conn = &mut setup_database().await;
    let customer = add_customer(conn, 6, vec![MealType::Lunch]).await;

    let before_start = NaiveDate::from_ymd_opt(2031, 2, 15).unwrap();
    let result = CustomerStore::new(conn)
        .update(
            customer.id,
            CustomerChangeset {
                subscription_end_date: Some(before_start),
                meals: Some(9),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(ServiceError::InvalidArgument(_))));
    assert_eq!(meals_of(conn, customer.id).await, 6);

    let updated = CustomerStore::new(conn)
        .update(
            customer.id,
            CustomerChangeset {
                subscription_start_date: Some(before_start),
                subscription_end_date: Some(before_start),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.subscription_start_date, before_start);
    assert_eq!(updated.subscription_end_date, before_start);
}
