//! In-memory `DirectoryStore` for handler tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::DirectoryStore;
use crate::error::StoreError;
use crate::models::{
    AdminActionLog, Business, BusinessSubmission, LiXiEntry, NewAdminActionLog, NewBusiness,
    NewLiXiEntry, NewSubmission, SubmissionStatus,
};

#[derive(Default)]
struct State {
    next_id: i64,
    businesses: Vec<Business>,
    submissions: Vec<BusinessSubmission>,
    logs: Vec<AdminActionLog>,
    li_xi: Vec<LiXiEntry>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    fail_writes: AtomicBool,
    fail_admin_logs: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every insert fail with a pool timeout.
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn fail_admin_logs(&self) {
        self.fail_admin_logs.store(true, Ordering::SeqCst);
    }

    fn check_writes(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    pub fn insert_business(&self, business: NewBusiness) -> Business {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        let record = Business {
            id,
            name: business.name,
            slug: business.slug,
            category: business.category,
            original_category: business.original_category,
            subcategory: business.subcategory,
            address: business.address,
            city: business.city,
            state: business.state,
            phone: business.phone,
            website: business.website,
            email: business.email,
            description: business.description,
            google_maps_link: business.google_maps_link,
            link_type: business.link_type,
            images: business.images,
            rating: business.rating,
            review_count: business.review_count,
            source: business.source,
            created_at: Utc::now(),
        };
        state.businesses.push(record.clone());
        record
    }

    /// Seeds a submission with a fixed id.
    pub fn insert_submission_with_id(&self, id: i64, submission: NewSubmission) -> BusinessSubmission {
        let mut state = self.state.lock().unwrap();
        state.next_id = state.next_id.max(id);
        let record = submission_record(id, submission);
        state.submissions.push(record.clone());
        record
    }

    pub fn businesses(&self) -> Vec<Business> {
        self.state.lock().unwrap().businesses.clone()
    }

    pub fn submissions(&self) -> Vec<BusinessSubmission> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn logs(&self) -> Vec<AdminActionLog> {
        self.state.lock().unwrap().logs.clone()
    }

    pub fn li_xi(&self) -> Vec<LiXiEntry> {
        self.state.lock().unwrap().li_xi.clone()
    }
}

fn submission_record(id: i64, submission: NewSubmission) -> BusinessSubmission {
    let now = Utc::now();
    BusinessSubmission {
        id,
        name: submission.name,
        category: submission.category,
        subcategory: submission.subcategory,
        address: submission.address,
        city: submission.city,
        state: submission.state,
        phone: submission.phone,
        website: submission.website,
        email: submission.email,
        description: submission.description,
        submitter_email: submission.submitter_email,
        google_maps_link: submission.google_maps_link,
        images: submission.images,
        status: SubmissionStatus::Pending,
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn list_businesses(&self) -> Result<Vec<Business>, StoreError> {
        Ok(self.businesses())
    }

    async fn get_business(&self, id: i64) -> Result<Option<Business>, StoreError> {
        Ok(self.businesses().into_iter().find(|b| b.id == id))
    }

    async fn find_business_by_slug(&self, slug: &str) -> Result<Option<Business>, StoreError> {
        Ok(self
            .businesses()
            .into_iter()
            .filter(|b| b.slug == slug)
            .min_by_key(|b| b.id))
    }

    async fn update_business(&self, business: Business) -> Result<Option<Business>, StoreError> {
        self.check_writes()?;
        let mut state = self.state.lock().unwrap();
        Ok(state
            .businesses
            .iter_mut()
            .find(|b| b.id == business.id)
            .map(|existing| {
                *existing = business;
                existing.clone()
            }))
    }

    async fn delete_business(&self, id: i64) -> Result<Option<Business>, StoreError> {
        self.check_writes()?;
        let mut state = self.state.lock().unwrap();
        let position = state.businesses.iter().position(|b| b.id == id);
        Ok(position.map(|i| state.businesses.remove(i)))
    }

    async fn create_submission(
        &self,
        submission: NewSubmission,
    ) -> Result<BusinessSubmission, StoreError> {
        self.check_writes()?;
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        let record = submission_record(id, submission);
        state.submissions.push(record.clone());
        Ok(record)
    }

    async fn list_pending_submissions(&self) -> Result<Vec<BusinessSubmission>, StoreError> {
        let mut pending: Vec<_> = self
            .submissions()
            .into_iter()
            .filter(|s| s.status == SubmissionStatus::Pending)
            .collect();
        pending.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(pending)
    }

    async fn approve_submission(
        &self,
        id: i64,
    ) -> Result<Option<(BusinessSubmission, Business)>, StoreError> {
        self.check_writes()?;
        let Some(submission) = self.submissions().into_iter().find(|s| s.id == id) else {
            return Ok(None);
        };
        if submission.status != SubmissionStatus::Pending {
            return Err(StoreError::Conflict(format!(
                "Submission {id} has already been processed"
            )));
        }

        let business = self.insert_business(NewBusiness::from_submission(&submission));

        let mut state = self.state.lock().unwrap();
        let stored = state
            .submissions
            .iter_mut()
            .find(|s| s.id == id)
            .map(|s| {
                s.status = SubmissionStatus::Approved;
                s.updated_at = Utc::now();
                s.clone()
            })
            .unwrap_or(submission);

        Ok(Some((stored, business)))
    }

    async fn delete_submission(&self, id: i64) -> Result<Option<BusinessSubmission>, StoreError> {
        self.check_writes()?;
        let mut state = self.state.lock().unwrap();
        let Some(position) = state.submissions.iter().position(|s| s.id == id) else {
            return Ok(None);
        };
        if state.submissions[position].status != SubmissionStatus::Pending {
            return Err(StoreError::Conflict(format!(
                "Submission {id} has already been processed"
            )));
        }
        Ok(Some(state.submissions.remove(position)))
    }

    async fn record_admin_action(
        &self,
        action: NewAdminActionLog,
    ) -> Result<AdminActionLog, StoreError> {
        if self.fail_admin_logs.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut state = self.state.lock().unwrap();
        let record = AdminActionLog {
            id: state.next_id(),
            action_type: action.action_type,
            business_name: action.business_name,
            business_category: action.business_category,
            business_address: action.business_address,
            business_phone: action.business_phone,
            business_email: action.business_email,
            business_website: action.business_website,
            notes: action.notes,
            action_timestamp: Utc::now(),
        };
        state.logs.push(record.clone());
        Ok(record)
    }

    async fn list_admin_actions(&self, limit: i64) -> Result<Vec<AdminActionLog>, StoreError> {
        let mut logs = self.logs();
        logs.reverse();
        logs.truncate(limit.max(0) as usize);
        Ok(logs)
    }

    async fn create_li_xi_entry(&self, entry: NewLiXiEntry) -> Result<LiXiEntry, StoreError> {
        self.check_writes()?;
        let mut state = self.state.lock().unwrap();
        let record = LiXiEntry {
            id: state.next_id(),
            email: entry.email,
            lucky_number: entry.lucky_number,
            business_name: entry.business_name,
            created_at: Utc::now(),
        };
        state.li_xi.push(record.clone());
        Ok(record)
    }

    async fn list_li_xi_entries(&self) -> Result<Vec<LiXiEntry>, StoreError> {
        let mut entries = self.li_xi();
        entries.reverse();
        Ok(entries)
    }

    async fn delete_li_xi_entry(&self, id: i64) -> Result<Option<LiXiEntry>, StoreError> {
        self.check_writes()?;
        let mut state = self.state.lock().unwrap();
        let position = state.li_xi.iter().position(|e| e.id == id);
        Ok(position.map(|i| state.li_xi.remove(i)))
    }
}
