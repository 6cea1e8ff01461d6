use chrono::NaiveDate;
use diesel::{dsl::{count_star, not}, insert_into, prelude::*, update};
use diesel_async::{scoped_futures::ScopedFutureExt, AsyncConnection, AsyncPgConnection, RunQueryDsl};
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ServiceError;
use crate::lifecycle::{attendance_change, AttendanceChange};
use crate::models::{Attendance, AttendanceStatus, NewAttendance, Role, StaffContact, User};
use crate::schema::{attendances, users};

#[derive(Debug, Clone, PartialEq)]
pub enum AttendanceMark {
    Created(Attendance),
    Updated(Attendance),
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct AttendanceWithUser {
    #[serde(flatten)]
    pub attendance: Attendance,
    pub user: StaffContact,
}

pub struct AttendanceStore<'a> {
    conn: &'a mut AsyncPgConnection,
}

impl<'a> AttendanceStore<'a> {
    pub fn new(conn: &'a mut AsyncPgConnection) -> Self {
        Self { conn }
    }

    /// Records attendance for one user and day. Re-marking with the same
    /// status is rejected; a different status overwrites the record.
    pub async fn mark(
        &mut self,
        user_id: Uuid,
        date: NaiveDate,
        status: AttendanceStatus,
    ) -> Result<AttendanceMark, ServiceError> {
        let mark = self
            .conn
            .transaction::<_, ServiceError, _>(|conn| {
                async move {
                    let user = users::table
                        .find(user_id)
                        .select(users::id)
                        .first::<Uuid>(conn)
                        .await
                        .optional()?;
                    if user.is_none() {
                        return Err(ServiceError::not_found("User"));
                    }

                    let existing = attendances::table
                        .filter(attendances::user_id.eq(user_id))
                        .filter(attendances::date.eq(date))
                        .select(Attendance::as_select())
                        .for_update()
                        .first(conn)
                        .await
                        .optional()?;

                    match (
                        attendance_change(existing.as_ref().map(|a| a.status), status)?,
                        existing,
                    ) {
                        (AttendanceChange::Update, Some(current)) => {
                            let updated = update(attendances::table.find(current.id))
                                .set(attendances::status.eq(status))
                                .returning(Attendance::as_returning())
                                .get_result(conn)
                                .await?;
                            Ok(AttendanceMark::Updated(updated))
                        }
                        _ => {
                            let created = insert_into(attendances::table)
                                .values(&NewAttendance {
                                    id: Uuid::new_v4(),
                                    user_id,
                                    date,
                                    status,
                                })
                                .returning(Attendance::as_returning())
                                .get_result(conn)
                                .await?;
                            Ok(AttendanceMark::Created(created))
                        }
                    }
                }
                .scope_boxed()
            })
            .await?;

        info!(%user_id, %date, %status, "attendance marked");
        Ok(mark)
    }

    /// Attendance records of `date` joined with the user's display fields.
    pub async fn for_date(&mut self, date: NaiveDate) -> Result<Vec<AttendanceWithUser>, ServiceError> {
        let rows = attendances::table
            .inner_join(users::table)
            .filter(attendances::date.eq(date))
            .select((Attendance::as_select(), StaffContact::as_select()))
            .order(attendances::created_at.asc())
            .load::<(Attendance, StaffContact)>(self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(attendance, user)| AttendanceWithUser { attendance, user })
            .collect())
    }

    /// Same as [`AttendanceStore::for_date`], but fails when no user is registered at all.
    pub async fn for_date_of_registered_users(
        &mut self,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceWithUser>, ServiceError> {
        let registered = users::table
            .select(count_star())
            .get_result::<i64>(self.conn)
            .await?;
        if registered == 0 {
            return Err(ServiceError::NotFound("No users found".to_string()));
        }
        self.for_date(date).await
    }

    /// Staff-role users that have no attendance record for `date`.
    pub async fn staff_without_attendance(&mut self, date: NaiveDate) -> Result<Vec<User>, ServiceError> {
        let marked = attendances::table
            .filter(attendances::date.eq(date))
            .select(attendances::user_id);

        Ok(users::table
            .filter(users::role.eq(Role::Staff))
            .filter(not(users::id.eq_any(marked)))
            .select(User::as_select())
            .order(users::name.asc())
            .load(self.conn)
            .await?)
    }
}
