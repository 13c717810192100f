use std::{future::Future, io::ErrorKind, path::PathBuf};

use anyhow::Result;
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncWriteExt},
};
use tracing::{debug, warn};

use super::entities::StoreSnapshot;

/// Name of the snapshot file inside the application directory.
pub const SNAPSHOT_FILE: &str = "carbon-trace.json";

/// Interface for abstracting persistence of the store state.
pub trait SnapshotStorage {
    /// Reads the last written snapshot. A missing snapshot yields the
    /// default state, matching a fresh install.
    fn load(&self) -> impl Future<Output = Result<StoreSnapshot>>;

    /// Rewrites the whole snapshot.
    fn save(&self, snapshot: &StoreSnapshot) -> impl Future<Output = Result<()>>;
}

/// The main realization of [SnapshotStorage]. Keeps the whole state in a
/// single json file.
pub struct JsonSnapshotStorage {
    path: PathBuf,
}

impl JsonSnapshotStorage {
    pub fn new(application_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&application_dir)?;

        Ok(Self {
            path: application_dir.join(SNAPSHOT_FILE),
        })
    }

    async fn read_contents(&self) -> std::result::Result<Option<String>, std::io::Error> {
        let mut file = match File::open(&self.path).await {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        file.lock_shared()?;
        let mut contents = String::new();
        let result = file.read_to_string(&mut contents).await;
        file.unlock_async().await?;
        result?;
        Ok(Some(contents))
    }

    async fn write_with_file(file: &mut File, snapshot: &StoreSnapshot) -> Result<()> {
        let buffer = serde_json::to_vec(snapshot)?;
        file.set_len(0).await?;
        file.write_all(&buffer).await?;
        file.flush().await?;
        Ok(())
    }
}

impl SnapshotStorage for JsonSnapshotStorage {
    async fn load(&self) -> Result<StoreSnapshot> {
        debug!("Loading snapshot from {:?}", self.path);
        let Some(contents) = self.read_contents().await? else {
            return Ok(StoreSnapshot::default());
        };

        match serde_json::from_str::<StoreSnapshot>(&contents) {
            Ok(v) => Ok(v),
            Err(e) => {
                // Might happen after a shutdown cutting off a write.
                warn!(
                    "Snapshot in path {:?} contains illegal json, starting clean: {e}",
                    self.path
                );
                Ok(StoreSnapshot::default())
            }
        }
    }

    async fn save(&self, snapshot: &StoreSnapshot) -> Result<()> {
        debug!("Writing snapshot to {:?}", self.path);
        let mut file = File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .await?;

        // Semi-safe acquire-release for the file
        file.lock_exclusive()?;
        let result = Self::write_with_file(&mut file, snapshot).await;
        file.unlock_async().await?;
        result
    }
}
