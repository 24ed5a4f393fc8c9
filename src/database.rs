use std::{borrow::Cow, collections::HashSet, time::Duration};

use async_trait::async_trait;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    Connection, Executor, PgPool,
};

use crate::error::StoreError;
use crate::models::{
    AdminActionLog, Business, BusinessSubmission, LiXiEntry, NewAdminActionLog, NewBusiness,
    NewLiXiEntry, NewSubmission, SubmissionStatus,
};

#[cfg(test)]
pub mod memory;

/// Everything the HTTP layer needs from persistent storage.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn list_businesses(&self) -> Result<Vec<Business>, StoreError>;
    async fn get_business(&self, id: i64) -> Result<Option<Business>, StoreError>;
    /// Lowest id wins when several listings share a slug.
    async fn find_business_by_slug(&self, slug: &str) -> Result<Option<Business>, StoreError>;
    async fn update_business(&self, business: Business) -> Result<Option<Business>, StoreError>;
    async fn delete_business(&self, id: i64) -> Result<Option<Business>, StoreError>;

    async fn create_submission(
        &self,
        submission: NewSubmission,
    ) -> Result<BusinessSubmission, StoreError>;
    async fn list_pending_submissions(&self) -> Result<Vec<BusinessSubmission>, StoreError>;
    /// Inserts the listing and marks the submission approved in one step.
    /// `Ok(None)` when the submission does not exist, `StoreError::Conflict` when it
    /// is no longer pending.
    async fn approve_submission(
        &self,
        id: i64,
    ) -> Result<Option<(BusinessSubmission, Business)>, StoreError>;
    /// Rejects a pending submission by deleting it. Same `None`/`Conflict` contract
    /// as `approve_submission`.
    async fn delete_submission(&self, id: i64) -> Result<Option<BusinessSubmission>, StoreError>;

    async fn record_admin_action(
        &self,
        action: NewAdminActionLog,
    ) -> Result<AdminActionLog, StoreError>;
    async fn list_admin_actions(&self, limit: i64) -> Result<Vec<AdminActionLog>, StoreError>;

    async fn create_li_xi_entry(&self, entry: NewLiXiEntry) -> Result<LiXiEntry, StoreError>;
    async fn list_li_xi_entries(&self) -> Result<Vec<LiXiEntry>, StoreError>;
    async fn delete_li_xi_entry(&self, id: i64) -> Result<Option<LiXiEntry>, StoreError>;
}

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = match pool_options().connect(database_url).await {
            Ok(pool) => pool,
            Err(sqlx::Error::Database(db_err)) if db_err.code() == Some(Cow::Borrowed("3D000")) => {
                log::info!("Database missing, attempting to create it");
                create_database_if_missing(database_url).await?;
                pool_options().connect(database_url).await?
            }
            Err(err) => return Err(err.into()),
        };

        // Run embedded migrations
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn existing_slugs(&self) -> Result<HashSet<String>, StoreError> {
        let slugs: Vec<String> = sqlx::query_scalar("SELECT slug FROM approved_businesses")
            .fetch_all(&self.pool)
            .await?;
        Ok(slugs.into_iter().collect())
    }

    /// Inserts a batch of listings in one transaction and returns how many were written.
    pub async fn insert_businesses(&self, businesses: Vec<NewBusiness>) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        for business in businesses {
            insert_business(tx.as_mut(), business).await?;
            inserted += 1;
        }
        tx.commit().await?;
        Ok(inserted)
    }
}

fn pool_options() -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Some(Duration::from_secs(600)))
        .test_before_acquire(true)
}

async fn insert_business<'e, E>(executor: E, business: NewBusiness) -> Result<Business, sqlx::Error>
where
    E: Executor<'e, Database = sqlx::Postgres>,
{
    let NewBusiness {
        name,
        slug,
        category,
        original_category,
        subcategory,
        address,
        city,
        state,
        phone,
        website,
        email,
        description,
        google_maps_link,
        link_type,
        images,
        rating,
        review_count,
        source,
    } = business;

    sqlx::query_as::<_, Business>(
        r#"
        INSERT INTO approved_businesses (
            name,
            slug,
            category,
            original_category,
            subcategory,
            address,
            city,
            state,
            phone,
            website,
            email,
            description,
            google_maps_link,
            link_type,
            images,
            rating,
            review_count,
            source
        )
        VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
            $11, $12, $13, $14, $15, $16, $17, $18
        )
        RETURNING
            id, name, slug, category, original_category, subcategory,
            address, city, state, phone, website, email, description,
            google_maps_link, link_type, images, rating, review_count,
            source, created_at
        "#,
    )
    .bind(name)
    .bind(slug)
    .bind(category)
    .bind(original_category)
    .bind(subcategory)
    .bind(address)
    .bind(city)
    .bind(state)
    .bind(phone)
    .bind(website)
    .bind(email)
    .bind(description)
    .bind(google_maps_link)
    .bind(link_type)
    .bind(images)
    .bind(rating)
    .bind(review_count)
    .bind(source)
    .fetch_one(executor)
    .await
}

#[async_trait]
impl DirectoryStore for Database {
    async fn list_businesses(&self) -> Result<Vec<Business>, StoreError> {
        let records = sqlx::query_as::<_, Business>(
            r#"
            SELECT
                id, name, slug, category, original_category, subcategory,
                address, city, state, phone, website, email, description,
                google_maps_link, link_type, images, rating, review_count,
                source, created_at
            FROM approved_businesses
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn get_business(&self, id: i64) -> Result<Option<Business>, StoreError> {
        let record = sqlx::query_as::<_, Business>(
            r#"
            SELECT
                id, name, slug, category, original_category, subcategory,
                address, city, state, phone, website, email, description,
                google_maps_link, link_type, images, rating, review_count,
                source, created_at
            FROM approved_businesses
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn find_business_by_slug(&self, slug: &str) -> Result<Option<Business>, StoreError> {
        let record = sqlx::query_as::<_, Business>(
            r#"
            SELECT
                id, name, slug, category, original_category, subcategory,
                address, city, state, phone, website, email, description,
                google_maps_link, link_type, images, rating, review_count,
                source, created_at
            FROM approved_businesses
            WHERE slug = $1
            ORDER BY id ASC
            LIMIT 1
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn update_business(&self, business: Business) -> Result<Option<Business>, StoreError> {
        let record = sqlx::query_as::<_, Business>(
            r#"
            UPDATE approved_businesses
            SET
                name = $2,
                slug = $3,
                category = $4,
                original_category = $5,
                subcategory = $6,
                address = $7,
                city = $8,
                state = $9,
                phone = $10,
                website = $11,
                email = $12,
                description = $13,
                google_maps_link = $14,
                images = $15
            WHERE id = $1
            RETURNING
                id, name, slug, category, original_category, subcategory,
                address, city, state, phone, website, email, description,
                google_maps_link, link_type, images, rating, review_count,
                source, created_at
            "#,
        )
        .bind(business.id)
        .bind(business.name)
        .bind(business.slug)
        .bind(business.category)
        .bind(business.original_category)
        .bind(business.subcategory)
        .bind(business.address)
        .bind(business.city)
        .bind(business.state)
        .bind(business.phone)
        .bind(business.website)
        .bind(business.email)
        .bind(business.description)
        .bind(business.google_maps_link)
        .bind(business.images)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn delete_business(&self, id: i64) -> Result<Option<Business>, StoreError> {
        let record = sqlx::query_as::<_, Business>(
            r#"
            DELETE FROM approved_businesses
            WHERE id = $1
            RETURNING
                id, name, slug, category, original_category, subcategory,
                address, city, state, phone, website, email, description,
                google_maps_link, link_type, images, rating, review_count,
                source, created_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn create_submission(
        &self,
        submission: NewSubmission,
    ) -> Result<BusinessSubmission, StoreError> {
        let NewSubmission {
            name,
            category,
            subcategory,
            address,
            city,
            state,
            phone,
            website,
            email,
            description,
            submitter_email,
            google_maps_link,
            images,
        } = submission;

        let record = sqlx::query_as::<_, BusinessSubmission>(
            r#"
            INSERT INTO business_submissions (
                name,
                category,
                subcategory,
                address,
                city,
                state,
                phone,
                website,
                email,
                description,
                submitter_email,
                google_maps_link,
                images,
                status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING
                id, name, category, subcategory, address, city, state, phone,
                website, email, description, submitter_email, google_maps_link,
                images, status, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(category)
        .bind(subcategory)
        .bind(address)
        .bind(city)
        .bind(state)
        .bind(phone)
        .bind(website)
        .bind(email)
        .bind(description)
        .bind(submitter_email)
        .bind(google_maps_link)
        .bind(images)
        .bind(SubmissionStatus::Pending)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn list_pending_submissions(&self) -> Result<Vec<BusinessSubmission>, StoreError> {
        let records = sqlx::query_as::<_, BusinessSubmission>(
            r#"
            SELECT
                id, name, category, subcategory, address, city, state, phone,
                website, email, description, submitter_email, google_maps_link,
                images, status, created_at, updated_at
            FROM business_submissions
            WHERE status = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(SubmissionStatus::Pending)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn approve_submission(
        &self,
        id: i64,
    ) -> Result<Option<(BusinessSubmission, Business)>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let submission = sqlx::query_as::<_, BusinessSubmission>(
            r#"
            SELECT
                id, name, category, subcategory, address, city, state, phone,
                website, email, description, submitter_email, google_maps_link,
                images, status, created_at, updated_at
            FROM business_submissions
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(tx.as_mut())
        .await?;

        let Some(submission) = submission else {
            return Ok(None);
        };
        if submission.status != SubmissionStatus::Pending {
            return Err(StoreError::Conflict(format!(
                "Submission {id} has already been processed"
            )));
        }

        let business = insert_business(tx.as_mut(), NewBusiness::from_submission(&submission)).await?;

        let submission = sqlx::query_as::<_, BusinessSubmission>(
            r#"
            UPDATE business_submissions
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING
                id, name, category, subcategory, address, city, state, phone,
                website, email, description, submitter_email, google_maps_link,
                images, status, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(SubmissionStatus::Approved)
        .fetch_one(tx.as_mut())
        .await?;

        tx.commit().await?;

        Ok(Some((submission, business)))
    }

    async fn delete_submission(&self, id: i64) -> Result<Option<BusinessSubmission>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let status = sqlx::query_scalar::<_, SubmissionStatus>(
            "SELECT status FROM business_submissions WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(tx.as_mut())
        .await?;

        match status {
            None => return Ok(None),
            Some(SubmissionStatus::Pending) => {}
            Some(_) => {
                return Err(StoreError::Conflict(format!(
                    "Submission {id} has already been processed"
                )))
            }
        }

        let record = sqlx::query_as::<_, BusinessSubmission>(
            r#"
            DELETE FROM business_submissions
            WHERE id = $1
            RETURNING
                id, name, category, subcategory, address, city, state, phone,
                website, email, description, submitter_email, google_maps_link,
                images, status, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(tx.as_mut())
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    async fn record_admin_action(
        &self,
        action: NewAdminActionLog,
    ) -> Result<AdminActionLog, StoreError> {
        let NewAdminActionLog {
            action_type,
            business_name,
            business_category,
            business_address,
            business_phone,
            business_email,
            business_website,
            notes,
        } = action;

        let record = sqlx::query_as::<_, AdminActionLog>(
            r#"
            INSERT INTO admin_action_logs (
                action_type,
                business_name,
                business_category,
                business_address,
                business_phone,
                business_email,
                business_website,
                notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING
                id, action_type, business_name, business_category, business_address,
                business_phone, business_email, business_website, notes, action_timestamp
            "#,
        )
        .bind(action_type)
        .bind(business_name)
        .bind(business_category)
        .bind(business_address)
        .bind(business_phone)
        .bind(business_email)
        .bind(business_website)
        .bind(notes)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn list_admin_actions(&self, limit: i64) -> Result<Vec<AdminActionLog>, StoreError> {
        let records = sqlx::query_as::<_, AdminActionLog>(
            r#"
            SELECT
                id, action_type, business_name, business_category, business_address,
                business_phone, business_email, business_website, notes, action_timestamp
            FROM admin_action_logs
            ORDER BY action_timestamp DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn create_li_xi_entry(&self, entry: NewLiXiEntry) -> Result<LiXiEntry, StoreError> {
        let record = sqlx::query_as::<_, LiXiEntry>(
            r#"
            INSERT INTO li_xi_entries (email, lucky_number, business_name)
            VALUES ($1, $2, $3)
            RETURNING id, email, lucky_number, business_name, created_at
            "#,
        )
        .bind(entry.email)
        .bind(entry.lucky_number)
        .bind(entry.business_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn list_li_xi_entries(&self) -> Result<Vec<LiXiEntry>, StoreError> {
        let records = sqlx::query_as::<_, LiXiEntry>(
            r#"
            SELECT id, email, lucky_number, business_name, created_at
            FROM li_xi_entries
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn delete_li_xi_entry(&self, id: i64) -> Result<Option<LiXiEntry>, StoreError> {
        let record = sqlx::query_as::<_, LiXiEntry>(
            r#"
            DELETE FROM li_xi_entries
            WHERE id = $1
            RETURNING id, email, lucky_number, business_name, created_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }
}

async fn create_database_if_missing(database_url: &str) -> Result<(), sqlx::Error> {
    let options: PgConnectOptions = database_url.parse()?;
    let database_name = options
        .get_database()
        .map(|name| name.to_string())
        .unwrap_or_else(|| "postgres".to_string());

    if database_name.eq_ignore_ascii_case("postgres") {
        return Ok(());
    }

    let maintenance_options = options.clone().database("postgres");
    let mut connection = sqlx::postgres::PgConnection::connect_with(&maintenance_options).await?;

    let create_stmt = format!("CREATE DATABASE \"{}\"", database_name.replace('"', "\"\""));

    match connection.execute(create_stmt.as_str()).await {
        Ok(_) => {
            log::info!("Created database '{}'", database_name);
            Ok(())
        }
        Err(sqlx::Error::Database(db_err)) if db_err.code() == Some(Cow::Borrowed("42P04")) => {
            log::info!("Database '{}' already exists", database_name);
            Ok(())
        }
        Err(err) => Err(err),
    }
}
