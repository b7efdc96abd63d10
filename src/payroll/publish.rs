use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::MySqlPool;
use tracing::{debug, warn};

use crate::config::Config;
use crate::payroll::store::PayrollWithEmployee;

/// Denormalized copy of a paid line, as written into the employee-visible
/// store and sent to any configured HTTP targets.
#[derive(Debug, Clone, Serialize)]
pub struct PayrollSnapshot {
    pub payroll_id: u64,
    pub employee_id: u64,
    pub month_year: String,
    pub emp_code: String,
    pub full_name: String,
    pub department: String,
    pub base_amount: f64,
    pub bonus_amount: f64,
    pub deduction_amount: f64,
    pub net_amount: f64,
    pub status: String,
    pub paid_at: Option<NaiveDateTime>,
    pub late_minutes: u32,
    pub absent_days: u32,
    pub paid_leave_days: u32,
    pub unpaid_leave_days: u32,
    pub workday_count: u32,
}

impl From<&PayrollWithEmployee> for PayrollSnapshot {
    fn from(line: &PayrollWithEmployee) -> Self {
        Self {
            payroll_id: line.id,
            employee_id: line.employee_id,
            month_year: line.month_year.clone(),
            emp_code: line.emp_code.clone(),
            full_name: line.full_name.clone(),
            department: line.department.clone(),
            base_amount: line.base_amount,
            bonus_amount: line.bonus_amount,
            deduction_amount: line.deduction_amount,
            net_amount: line.net_amount,
            status: line.status.clone(),
            paid_at: line.paid_at,
            late_minutes: line.late_minutes,
            absent_days: line.absent_days,
            paid_leave_days: line.paid_leave_days,
            unpaid_leave_days: line.unpaid_leave_days,
            workday_count: line.workday_count,
        }
    }
}

/// One place a snapshot can be delivered to. All targets share the logical
/// contract "upsert the employee-visible copy, keyed by employee + month".
#[async_trait]
pub trait PublishTarget: Send + Sync {
    fn name(&self) -> &str;
    async fn upsert_employee_visible(&self, snapshot: &PayrollSnapshot) -> anyhow::Result<()>;
}

/// Primary target: the user_payrolls table in the same database.
pub struct DbPublishTarget {
    pool: MySqlPool,
}

impl DbPublishTarget {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PublishTarget for DbPublishTarget {
    fn name(&self) -> &str {
        "database"
    }

    async fn upsert_employee_visible(&self, snapshot: &PayrollSnapshot) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_payrolls
                (employee_id, month_year, payroll_id, emp_code, full_name, department,
                 base_amount, bonus_amount, deduction_amount, net_amount, status, paid_at,
                 late_minutes, absent_days, paid_leave_days, unpaid_leave_days, workday_count)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                payroll_id = VALUES(payroll_id),
                emp_code = VALUES(emp_code),
                full_name = VALUES(full_name),
                department = VALUES(department),
                base_amount = VALUES(base_amount),
                bonus_amount = VALUES(bonus_amount),
                deduction_amount = VALUES(deduction_amount),
                net_amount = VALUES(net_amount),
                status = VALUES(status),
                paid_at = VALUES(paid_at),
                late_minutes = VALUES(late_minutes),
                absent_days = VALUES(absent_days),
                paid_leave_days = VALUES(paid_leave_days),
                unpaid_leave_days = VALUES(unpaid_leave_days),
                workday_count = VALUES(workday_count)
            "#,
        )
        .bind(snapshot.employee_id)
        .bind(&snapshot.month_year)
        .bind(snapshot.payroll_id)
        .bind(&snapshot.emp_code)
        .bind(&snapshot.full_name)
        .bind(&snapshot.department)
        .bind(snapshot.base_amount)
        .bind(snapshot.bonus_amount)
        .bind(snapshot.deduction_amount)
        .bind(snapshot.net_amount)
        .bind(&snapshot.status)
        .bind(snapshot.paid_at)
        .bind(snapshot.late_minutes)
        .bind(snapshot.absent_days)
        .bind(snapshot.paid_leave_days)
        .bind(snapshot.unpaid_leave_days)
        .bind(snapshot.workday_count)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Fallback target: POST the snapshot to an external inbox endpoint.
pub struct HttpPublishTarget {
    client: reqwest::Client,
    url: String,
}

impl HttpPublishTarget {
    pub fn new(client: reqwest::Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl PublishTarget for HttpPublishTarget {
    fn name(&self) -> &str {
        &self.url
    }

    async fn upsert_employee_visible(&self, snapshot: &PayrollSnapshot) -> anyhow::Result<()> {
        self.client
            .post(&self.url)
            .json(snapshot)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Ordered, best-effort fallback chain: targets are tried sequentially under
/// a per-attempt timeout, stopping at the first success. Exhausting the list
/// is reported to the caller as `false`, never as an error; the payroll row
/// stays authoritative whether or not publishing worked.
pub struct Publisher {
    targets: Vec<Box<dyn PublishTarget>>,
    attempt_timeout: Duration,
}

impl Publisher {
    pub fn new(targets: Vec<Box<dyn PublishTarget>>, attempt_timeout: Duration) -> Self {
        Self {
            targets,
            attempt_timeout,
        }
    }

    pub fn from_config(pool: MySqlPool, config: &Config) -> Self {
        let client = reqwest::Client::new();
        let mut targets: Vec<Box<dyn PublishTarget>> = vec![Box::new(DbPublishTarget::new(pool))];
        for url in &config.publish_endpoints {
            targets.push(Box::new(HttpPublishTarget::new(client.clone(), url.clone())));
        }
        Self::new(targets, Duration::from_secs(config.publish_timeout_secs))
    }

    pub async fn publish(&self, snapshot: &PayrollSnapshot) -> bool {
        for target in &self.targets {
            match actix_web::rt::time::timeout(
                self.attempt_timeout,
                target.upsert_employee_visible(snapshot),
            )
            .await
            {
                Ok(Ok(())) => {
                    debug!(
                        target = target.name(),
                        employee_id = snapshot.employee_id,
                        month_year = %snapshot.month_year,
                        "Published payroll snapshot"
                    );
                    return true;
                }
                Ok(Err(e)) => {
                    warn!(target = target.name(), error = %e, "Publish attempt failed");
                }
                Err(_) => {
                    warn!(target = target.name(), "Publish attempt timed out");
                }
            }
        }

        warn!(
            employee_id = snapshot.employee_id,
            month_year = %snapshot.month_year,
            "All publish targets failed; payroll row remains authoritative"
        );
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FakeTarget {
        label: &'static str,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl PublishTarget for FakeTarget {
        fn name(&self) -> &str {
            self.label
        }

        async fn upsert_employee_visible(&self, _snapshot: &PayrollSnapshot) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("target down")
            }
            Ok(())
        }
    }

    fn snapshot() -> PayrollSnapshot {
        PayrollSnapshot {
            payroll_id: 1,
            employee_id: 7,
            month_year: "2026-01".to_string(),
            emp_code: "EMP-007".to_string(),
            full_name: "Somchai Jaidee".to_string(),
            department: "Engineering".to_string(),
            base_amount: 30000.0,
            bonus_amount: 0.0,
            deduction_amount: 85.0,
            net_amount: 29915.0,
            status: "paid".to_string(),
            paid_at: None,
            late_minutes: 30,
            absent_days: 0,
            paid_leave_days: 0,
            unpaid_leave_days: 0,
            workday_count: 22,
        }
    }

    #[actix_web::test]
    async fn stops_at_the_first_successful_target() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let publisher = Publisher::new(
            vec![
                Box::new(FakeTarget {
                    label: "primary",
                    fail: false,
                    calls: first.clone(),
                }),
                Box::new(FakeTarget {
                    label: "fallback",
                    fail: false,
                    calls: second.clone(),
                }),
            ],
            Duration::from_secs(1),
        );

        assert!(publisher.publish(&snapshot()).await);
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[actix_web::test]
    async fn falls_through_to_the_next_target_on_failure() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let publisher = Publisher::new(
            vec![
                Box::new(FakeTarget {
                    label: "primary",
                    fail: true,
                    calls: first.clone(),
                }),
                Box::new(FakeTarget {
                    label: "fallback",
                    fail: false,
                    calls: second.clone(),
                }),
            ],
            Duration::from_secs(1),
        );

        assert!(publisher.publish(&snapshot()).await);
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[actix_web::test]
    async fn reports_false_when_every_target_fails() {
        let calls = Arc::new(AtomicUsize::new(0));
        let publisher = Publisher::new(
            vec![
                Box::new(FakeTarget {
                    label: "primary",
                    fail: true,
                    calls: calls.clone(),
                }),
                Box::new(FakeTarget {
                    label: "fallback",
                    fail: true,
                    calls: calls.clone(),
                }),
            ],
            Duration::from_secs(1),
        );

        assert!(!publisher.publish(&snapshot()).await);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[actix_web::test]
    async fn publishing_twice_calls_upsert_not_insert() {
        // The DB target's statement is an upsert on (employee_id, month_year);
        // at this level we just assert a second publish is accepted.
        let calls = Arc::new(AtomicUsize::new(0));
        let publisher = Publisher::new(
            vec![Box::new(FakeTarget {
                label: "primary",
                fail: false,
                calls: calls.clone(),
            })],
            Duration::from_secs(1),
        );

        let snap = snapshot();
        assert!(publisher.publish(&snap).await);
        assert!(publisher.publish(&snap).await);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
