//! DuckDB persistence for petitions and generation jobs.

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use duckdb::{Connection, OptionalExt, params};
use meritdraft_core::{GenerationJob, GenerationStep, JobStatus, Petition};
use parking_lot::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::StoreError;
use crate::traits::{JobStore, PetitionStore};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS petitions (
    id VARCHAR PRIMARY KEY,
    body VARCHAR NOT NULL
);
CREATE TABLE IF NOT EXISTS generation_jobs (
    id VARCHAR PRIMARY KEY,
    petition_id VARCHAR NOT NULL,
    created_at BIGINT NOT NULL,
    body VARCHAR NOT NULL
);
";

/// DuckDB store for petitions and generation jobs.
///
/// Each record is stored whole as a JSON body keyed by id; the job table also
/// carries `petition_id` and `created_at` so the latest job for a petition is
/// a single indexed lookup.
///
/// Use [`open`](Self::open) for an ephemeral in-memory database and
/// [`open_persistent`](Self::open_persistent) for file-backed storage that
/// survives across process restarts.
pub struct DuckStore {
    conn: Mutex<Connection>,
}

impl DuckStore {
    /// Open an in-memory DuckDB database.
    pub fn open() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    /// Open or create a persistent DuckDB database at the given path.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "opened draft database");
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn petition_count(&self) -> Result<usize, StoreError> {
        self.count_table("petitions")
    }

    pub fn job_count(&self) -> Result<usize, StoreError> {
        self.count_table("generation_jobs")
    }

    fn count_table(&self, table: &str) -> Result<usize, StoreError> {
        let sql = format!("SELECT count(*)::BIGINT FROM {table}");
        let n: i64 = self.conn.lock().query_row(&sql, [], |row| row.get(0))?;
        Ok(n as usize)
    }

    fn load_job(&self, id: Uuid) -> Result<GenerationJob, StoreError> {
        let body: Option<String> = self
            .conn
            .lock()
            .query_row(
                "SELECT body FROM generation_jobs WHERE id = ?",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        let body = body.ok_or(StoreError::JobNotFound(id))?;
        Ok(serde_json::from_str(&body)?)
    }

    fn save_job(&self, job: &GenerationJob) -> Result<(), StoreError> {
        let body = serde_json::to_string(job)?;
        let changed = self.conn.lock().execute(
            "UPDATE generation_jobs SET body = ? WHERE id = ?",
            params![body, job.id.to_string()],
        )?;
        if changed == 0 {
            return Err(StoreError::JobNotFound(job.id));
        }
        Ok(())
    }

    /// Read, modify and write back one job. Rejected updates write nothing.
    fn modify_job(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut GenerationJob) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let mut job = self.load_job(id)?;
        f(&mut job)?;
        self.save_job(&job)?;
        debug!(job_id = %id, status = job.status.as_str(), "job updated");
        Ok(())
    }

    fn load_petition(&self, id: Uuid) -> Result<Petition, StoreError> {
        let body: Option<String> = self
            .conn
            .lock()
            .query_row(
                "SELECT body FROM petitions WHERE id = ?",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        let body = body.ok_or(StoreError::PetitionNotFound(id))?;
        Ok(serde_json::from_str(&body)?)
    }

    fn save_petition(&self, petition: &Petition) -> Result<(), StoreError> {
        let body = serde_json::to_string(petition)?;
        let changed = self.conn.lock().execute(
            "UPDATE petitions SET body = ? WHERE id = ?",
            params![body, petition.id.to_string()],
        )?;
        if changed == 0 {
            return Err(StoreError::PetitionNotFound(petition.id));
        }
        Ok(())
    }

    fn exists(&self, table: &str, id: Uuid) -> Result<bool, StoreError> {
        let sql = format!("SELECT count(*)::BIGINT FROM {table} WHERE id = ?");
        let n: i64 = self
            .conn
            .lock()
            .query_row(&sql, [id.to_string()], |row| row.get(0))?;
        Ok(n > 0)
    }
}

#[async_trait]
impl PetitionStore for DuckStore {
    async fn create(&self, petition: &Petition) -> Result<(), StoreError> {
        if self.exists("petitions", petition.id)? {
            return Err(StoreError::AlreadyExists(petition.id));
        }
        let body = serde_json::to_string(petition)?;
        self.conn.lock().execute(
            "INSERT INTO petitions (id, body) VALUES (?, ?)",
            params![petition.id.to_string(), body],
        )?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Petition, StoreError> {
        self.load_petition(id)
    }

    async fn update(&self, petition: &Petition) -> Result<(), StoreError> {
        let mut updated = petition.clone();
        updated.updated_at = Utc::now();
        self.save_petition(&updated)
    }

    async fn set_generated_content(&self, id: Uuid, content: &str) -> Result<(), StoreError> {
        let mut petition = self.load_petition(id)?;
        petition.generated_content = Some(content.to_string());
        petition.updated_at = Utc::now();
        self.save_petition(&petition)
    }
}

#[async_trait]
impl JobStore for DuckStore {
    async fn create(&self, job: &GenerationJob) -> Result<(), StoreError> {
        if self.exists("generation_jobs", job.id)? {
            return Err(StoreError::AlreadyExists(job.id));
        }
        let body = serde_json::to_string(job)?;
        self.conn.lock().execute(
            "INSERT INTO generation_jobs (id, petition_id, created_at, body) VALUES (?, ?, ?, ?)",
            params![
                job.id.to_string(),
                job.petition_id.to_string(),
                job.created_at.timestamp_micros(),
                body
            ],
        )?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<GenerationJob, StoreError> {
        self.load_job(id)
    }

    async fn latest_for_petition(
        &self,
        petition_id: Uuid,
    ) -> Result<Option<GenerationJob>, StoreError> {
        let body: Option<String> = self
            .conn
            .lock()
            .query_row(
                "SELECT body FROM generation_jobs WHERE petition_id = ? \
                 ORDER BY created_at DESC LIMIT 1",
                [petition_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        match body {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    async fn update_status(&self, id: Uuid, status: JobStatus) -> Result<(), StoreError> {
        self.modify_job(id, |job| Ok(job.transition(status)?))
    }

    async fn update_progress(
        &self,
        id: Uuid,
        current_step: &str,
        steps: &[GenerationStep],
    ) -> Result<(), StoreError> {
        self.modify_job(id, |job| {
            job.current_step = Some(current_step.to_string());
            job.steps = steps.to_vec();
            job.updated_at = Utc::now();
            Ok(())
        })
    }

    async fn mark_failed(&self, id: Uuid, message: &str) -> Result<(), StoreError> {
        self.modify_job(id, |job| Ok(job.fail(message)?))
    }

    async fn mark_completed(&self, id: Uuid) -> Result<(), StoreError> {
        self.modify_job(id, |job| Ok(job.transition(JobStatus::Completed)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meritdraft_core::{Criterion, StepStatus};

    #[tokio::test]
    async fn open_in_memory_creates_tables() {
        let store = DuckStore::open().unwrap();
        assert_eq!(store.petition_count().unwrap(), 0);
        assert_eq!(store.job_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn petition_round_trip() {
        let store = DuckStore::open().unwrap();
        let mut p = Petition::new(Uuid::new_v4());
        p.client_name = "Dr. Jane Smith".into();
        p.selected_criteria = vec![Criterion::Awards, Criterion::Judging];
        PetitionStore::create(&store, &p).await.unwrap();

        let loaded = PetitionStore::get(&store, p.id).await.unwrap();
        assert_eq!(loaded.client_name, "Dr. Jane Smith");
        assert_eq!(loaded.selected_criteria, p.selected_criteria);
        assert!(loaded.generated_content.is_none());

        store.set_generated_content(p.id, "PETITION").await.unwrap();
        let loaded = PetitionStore::get(&store, p.id).await.unwrap();
        assert_eq!(loaded.generated_content.as_deref(), Some("PETITION"));
    }

    #[tokio::test]
    async fn missing_records_are_not_found() {
        let store = DuckStore::open().unwrap();
        let id = Uuid::new_v4();
        assert!(matches!(
            PetitionStore::get(&store, id).await,
            Err(StoreError::PetitionNotFound(_))
        ));
        assert!(matches!(
            JobStore::get(&store, id).await,
            Err(StoreError::JobNotFound(_))
        ));
        assert!(matches!(
            store.mark_failed(id, "x").await,
            Err(StoreError::JobNotFound(_))
        ));
    }

    #[tokio::test]
    async fn job_progress_and_completion() {
        let store = DuckStore::open().unwrap();
        let mut job = GenerationJob::new(Uuid::new_v4(), &[Criterion::Judging]);
        JobStore::create(&store, &job).await.unwrap();
        store
            .update_status(job.id, JobStatus::InProgress)
            .await
            .unwrap();

        let step = Criterion::Judging.step_name();
        job.set_step_status(&step, StepStatus::InProgress).unwrap();
        job.set_step_status(&step, StepStatus::Completed).unwrap();
        store.update_progress(job.id, &step, &job.steps).await.unwrap();
        store.mark_completed(job.id).await.unwrap();

        let loaded = JobStore::get(&store, job.id).await.unwrap();
        assert_eq!(loaded.status, JobStatus::Completed);
        assert_eq!(loaded.steps[0].status, StepStatus::Completed);
        assert!(loaded.completed_at.is_some());
    }

    #[tokio::test]
    async fn pending_job_cannot_complete() {
        let store = DuckStore::open().unwrap();
        let job = GenerationJob::new(Uuid::new_v4(), &[Criterion::Awards]);
        JobStore::create(&store, &job).await.unwrap();

        assert!(matches!(
            store.mark_completed(job.id).await,
            Err(StoreError::Job(_))
        ));
        let loaded = JobStore::get(&store, job.id).await.unwrap();
        assert_eq!(loaded.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn latest_for_petition_picks_newest() {
        let store = DuckStore::open().unwrap();
        let petition_id = Uuid::new_v4();
        let old = GenerationJob::new(petition_id, &[Criterion::Awards]);
        let mut new = GenerationJob::new(petition_id, &[Criterion::Awards]);
        new.created_at = old.created_at + chrono::Duration::seconds(1);
        JobStore::create(&store, &new).await.unwrap();
        JobStore::create(&store, &old).await.unwrap();

        let latest = store.latest_for_petition(petition_id).await.unwrap().unwrap();
        assert_eq!(latest.id, new.id);
    }

    #[tokio::test]
    async fn persistent_reopen_keeps_jobs() {
        let tmp = tempfile::TempDir::new().unwrap();
        let db_path = tmp.path().join("drafts.duckdb");

        let job = GenerationJob::new(Uuid::new_v4(), &[Criterion::Awards]);
        {
            let store = DuckStore::open_persistent(&db_path).unwrap();
            JobStore::create(&store, &job).await.unwrap();
        }

        let store = DuckStore::open_persistent(&db_path).unwrap();
        let loaded = JobStore::get(&store, job.id).await.unwrap();
        assert_eq!(loaded.steps.len(), job.steps.len());
    }
}
