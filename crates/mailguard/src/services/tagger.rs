//! Tag customers on their billing date and untag them afterwards.
//!
//! Both passes only read the billing map and only write remote tags, so they
//! run without the suppression run flag. "Today" is computed once per pass
//! in the configured timezone.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use mailguard_core::CustomerId;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, instrument};

use crate::directory::{CustomerDirectory, with_retry};
use crate::pacing::Pacing;
use crate::shopify::ShopifyError;
use crate::store::BillingStore;

/// Counters of a tag-due pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagReport {
    /// Billing entries dated today.
    pub due: usize,
    pub tagged: usize,
    pub already_tagged: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

/// Counters of an untag-expired pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UntagReport {
    /// Customers currently carrying the due tag.
    pub candidates: usize,
    /// Customers still due today, left tagged.
    pub kept: usize,
    pub untagged: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

/// Applies and removes the "due today" tag from the billing map.
pub struct BillingTagger {
    directory: Arc<dyn CustomerDirectory>,
    billing: Arc<BillingStore>,
    tag: String,
    timezone: Tz,
    pacing: Pacing,
}

impl std::fmt::Debug for BillingTagger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BillingTagger")
            .field("tag", &self.tag)
            .field("timezone", &self.timezone)
            .finish_non_exhaustive()
    }
}

impl BillingTagger {
    #[must_use]
    pub fn new(
        directory: Arc<dyn CustomerDirectory>,
        billing: Arc<BillingStore>,
        tag: impl Into<String>,
        timezone: Tz,
        pacing: Pacing,
    ) -> Self {
        Self {
            directory,
            billing,
            tag: tag.into(),
            timezone,
            pacing,
        }
    }

    /// Current calendar date in the configured timezone.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }

    /// Tag every customer whose billing date is today.
    pub async fn tag_due(&self) -> TagReport {
        self.tag_due_on(self.today()).await
    }

    /// Tag every customer whose billing date is `today`.
    ///
    /// Customers that already carry the tag are left untouched.
    #[instrument(skip(self), fields(tag = %self.tag))]
    pub async fn tag_due_on(&self, today: NaiveDate) -> TagReport {
        let started = Instant::now();
        let due: Vec<CustomerId> = self
            .billing
            .snapshot()
            .await
            .into_iter()
            .filter(|(_, entry)| entry.is_due_on(today))
            .map(|(id, _)| id)
            .collect();
        info!(count = due.len(), "Tagging customers billed today");

        let mut report = TagReport {
            due: due.len(),
            ..TagReport::default()
        };

        for id in due {
            match self.add_tag(id).await {
                Ok(true) => report.tagged += 1,
                Ok(false) => report.already_tagged += 1,
                Err(e) => {
                    error!(customer_id = %id, error = %e, "Failed to tag customer");
                    report.failed += 1;
                }
            }
            sleep(self.pacing.tagging_delay).await;
        }

        report.elapsed = started.elapsed();
        info!(
            tagged = report.tagged,
            already_tagged = report.already_tagged,
            failed = report.failed,
            "Tagging complete"
        );
        report
    }

    /// Returns whether the tag was added.
    async fn add_tag(&self, id: CustomerId) -> Result<bool, ShopifyError> {
        let mut tags = with_retry("get_tags", id, self.pacing.retry_delay, || {
            self.directory.get_tags(id)
        })
        .await?;

        if !tags.add(&self.tag) {
            debug!(customer_id = %id, "Already tagged");
            return Ok(false);
        }

        with_retry("set_tags", id, self.pacing.retry_delay, || {
            self.directory.set_tags(id, &tags)
        })
        .await?;
        debug!(customer_id = %id, "Tagged");
        Ok(true)
    }

    /// Remove the tag from customers whose billing date is no longer today.
    pub async fn untag_expired(&self) -> UntagReport {
        self.untag_expired_on(self.today()).await
    }

    /// Remove the tag from every tagged customer not due on `today`.
    ///
    /// A customer with no billing entry counts as expired.
    #[instrument(skip(self), fields(tag = %self.tag))]
    pub async fn untag_expired_on(&self, today: NaiveDate) -> UntagReport {
        let started = Instant::now();
        let customers = self.directory.list_by_tag(&self.tag).await;
        info!(count = customers.len(), "Checking tagged customers");

        let mut report = UntagReport {
            candidates: customers.len(),
            ..UntagReport::default()
        };

        for customer in customers {
            let entry = self.billing.get(customer.id).await;
            if entry.as_ref().is_some_and(|e| e.is_due_on(today)) {
                debug!(customer_id = %customer.id, "Still due today, keeping tag");
                report.kept += 1;
                continue;
            }

            match self.remove_tag(customer.id).await {
                Ok(()) => report.untagged += 1,
                Err(e) => {
                    error!(customer_id = %customer.id, error = %e, "Failed to untag customer");
                    report.failed += 1;
                }
            }
            sleep(self.pacing.tagging_delay).await;
        }

        report.elapsed = started.elapsed();
        info!(
            kept = report.kept,
            untagged = report.untagged,
            failed = report.failed,
            "Untagging complete"
        );
        report
    }

    async fn remove_tag(&self, id: CustomerId) -> Result<(), ShopifyError> {
        let mut tags = with_retry("get_tags", id, self.pacing.retry_delay, || {
            self.directory.get_tags(id)
        })
        .await?;

        if tags.remove_ignore_case(&self.tag) == 0 {
            debug!(customer_id = %id, "Tag already gone");
            return Ok(());
        }

        with_retry("set_tags", id, self.pacing.retry_delay, || {
            self.directory.set_tags(id, &tags)
        })
        .await?;
        debug!(customer_id = %id, "Untagged");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use mailguard_core::BillingEntry;
    use tempfile::TempDir;

    use super::*;
    use crate::directory::InMemoryDirectory;

    const DUE: &str = "subscription due today";

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    async fn tagger(
        directory: &Arc<InMemoryDirectory>,
        billing: &[(u64, &str)],
    ) -> (TempDir, BillingTagger) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(BillingStore::open(dir.path()).await.unwrap());
        for (id, day) in billing {
            store
                .upsert(
                    CustomerId::new(*id),
                    BillingEntry {
                        next_billing_date: date(day),
                        email: format!("{id}@x.com"),
                    },
                )
                .await
                .unwrap();
        }

        let tagger = BillingTagger::new(
            Arc::clone(directory) as Arc<dyn CustomerDirectory>,
            store,
            DUE,
            chrono_tz::America::New_York,
            Pacing::default(),
        );
        (dir, tagger)
    }

    #[tokio::test(start_paused = true)]
    async fn test_tag_due_adds_tag_once() {
        let directory = Arc::new(
            InMemoryDirectory::new()
                .with_customer(1, "a@x.com", "vip")
                .with_customer(2, "b@x.com", "vip"),
        );
        let (_dir, tagger) = tagger(&directory, &[(1, "2025-06-30"), (2, "2025-07-01")]).await;

        let first = tagger.tag_due_on(date("2025-06-30")).await;
        let second = tagger.tag_due_on(date("2025-06-30")).await;

        assert_eq!(first.due, 1);
        assert_eq!(first.tagged, 1);
        assert_eq!(second.already_tagged, 1);
        assert_eq!(directory.tags(1).unwrap().to_string(), "vip, subscription due today");
        assert_eq!(directory.tags(2).unwrap().to_string(), "vip");
        assert_eq!(directory.tag_writes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tag_due_continues_after_failure() {
        let directory = Arc::new(
            InMemoryDirectory::new()
                .with_customer(1, "a@x.com", "")
                .with_customer(2, "b@x.com", ""),
        );
        directory.fail_tag_reads(1, 3);
        let (_dir, tagger) = tagger(&directory, &[(1, "2025-06-30"), (2, "2025-06-30")]).await;

        let report = tagger.tag_due_on(date("2025-06-30")).await;

        assert_eq!(report.failed, 1);
        assert_eq!(report.tagged, 1);
        assert!(directory.tags(2).unwrap().contains(DUE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tag_due_missing_customer_is_failure() {
        let directory = Arc::new(InMemoryDirectory::new());
        let (_dir, tagger) = tagger(&directory, &[(5, "2025-06-30")]).await;

        let report = tagger.tag_due_on(date("2025-06-30")).await;

        assert_eq!(report.failed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_untag_expired() {
        let directory = Arc::new(
            InMemoryDirectory::new()
                .with_customer(1, "a@x.com", "vip, subscription due today")
                .with_customer(2, "b@x.com", "Subscription Due Today, vip")
                .with_customer(3, "c@x.com", "subscription due today")
                .with_customer(4, "d@x.com", "vip"),
        );
        let (_dir, tagger) = tagger(&directory, &[(1, "2025-06-30"), (2, "2025-06-29")]).await;

        let report = tagger.untag_expired_on(date("2025-06-30")).await;

        assert_eq!(report.candidates, 3);
        assert_eq!(report.kept, 1);
        assert_eq!(report.untagged, 2);
        assert!(directory.tags(1).unwrap().contains(DUE));
        assert_eq!(directory.tags(2).unwrap().to_string(), "vip");
        assert!(directory.tags(3).unwrap().is_empty());
        assert_eq!(directory.tags(4).unwrap().to_string(), "vip");
    }

    #[tokio::test(start_paused = true)]
    async fn test_untag_continues_after_failure() {
        let directory = Arc::new(
            InMemoryDirectory::new()
                .with_customer(1, "a@x.com", "vip, subscription due today")
                .with_customer(2, "b@x.com", "subscription due today, vip"),
        );
        directory.fail_tag_writes(1, 3);
        let (_dir, tagger) = tagger(&directory, &[(1, "2025-06-29")]).await;

        let report = tagger.untag_expired_on(date("2025-06-30")).await;

        assert_eq!(report.candidates, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.untagged, 1);
        assert!(directory.tags(1).unwrap().contains(DUE));
        assert_eq!(directory.tags(2).unwrap().to_string(), "vip");
        assert_eq!(directory.tag_writes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_untag_paces_only_remote_work() {
        let directory = Arc::new(
            InMemoryDirectory::new()
                .with_customer(1, "a@x.com", "subscription due today")
                .with_customer(2, "b@x.com", "subscription due today"),
        );
        let (_dir, tagger) = tagger(&directory, &[(1, "2025-06-30")]).await;
        let started = Instant::now();

        tagger.untag_expired_on(date("2025-06-30")).await;

        assert_eq!(started.elapsed(), Duration::from_millis(500));
    }
}
