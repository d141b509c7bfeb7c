//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `resources` - Capacity rows, one per resource (key: resource_id)
//! - `reservations` - Append-only reservation records (key: reservation_id)
//! - `requester_index` - Listing index (key: requester_id || '|' || reservation_id)
//!
//! A reservation and its resource's adjusted capacity row are always written
//! through one [`WriteBatch`], so readers never observe one without the other.

use crate::{
    error::{Error, Result},
    types::{RequesterId, Reservation, Resource, ResourceId},
    Config,
};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBCompactionStyle, DBIteratorWithThreadMode,
    Direction, IteratorMode, Options, WriteBatch, WriteOptions, DB,
};
use std::sync::Arc;
use uuid::Uuid;

/// Column family names
const CF_RESOURCES: &str = "resources";
const CF_RESERVATIONS: &str = "reservations";
const CF_REQUESTER_INDEX: &str = "requester_index";

/// Separator between requester ID and reservation ID in index keys
const INDEX_SEPARATOR: u8 = b'|';

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,
    sync_writes: bool,
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        // Database options
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // Tuning from config
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_target_file_size_base(config.rocksdb.target_file_size_mb * 1024 * 1024);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);
        db_opts.set_level_zero_file_num_compaction_trigger(
            config.rocksdb.level0_file_num_compaction_trigger,
        );

        // Universal compaction for write-heavy workload
        db_opts.set_compaction_style(DBCompactionStyle::Universal);

        // Enable statistics
        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        // Column family descriptors
        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_RESOURCES, Self::cf_options_resources()),
            ColumnFamilyDescriptor::new(CF_RESERVATIONS, Self::cf_options_reservations()),
            ColumnFamilyDescriptor::new(CF_REQUESTER_INDEX, Self::cf_options_index()),
        ];

        // Open database
        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(
            path = %path.display(),
            sync_writes = config.rocksdb.sync_writes,
            "Opened RocksDB"
        );

        Ok(Self {
            db: Arc::new(db),
            sync_writes: config.rocksdb.sync_writes,
        })
    }

    // Column family options

    fn cf_options_resources() -> Options {
        let mut opts = Options::default();
        // Capacity rows are read on every booking, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_reservations() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts.set_bottommost_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_options_index() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        // Index lookups benefit from bloom filters
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false); // 10 bits per key
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    // Helper: get column family handle

    fn cf_handle(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::PersistenceFailure(format!("Column family {} not found", name)))
    }

    // Helper: write options honoring the durability setting

    fn write_options(&self) -> WriteOptions {
        let mut opts = WriteOptions::default();
        opts.set_sync(self.sync_writes);
        opts
    }

    // Resource operations

    /// Put resource row (single, unbatched)
    pub fn put_resource(&self, resource: &Resource) -> Result<()> {
        let cf = self.cf_handle(CF_RESOURCES)?;
        let key = resource.id.as_str().as_bytes();
        let value = bincode::serialize(resource)?;

        self.db.put_cf_opt(&cf, key, &value, &self.write_options())?;

        tracing::debug!(
            resource_id = %resource.id,
            available = resource.available_seats,
            active = resource.active,
            "Resource row written"
        );

        Ok(())
    }

    /// Get resource row by ID
    pub fn get_resource(&self, id: &ResourceId) -> Result<Option<Resource>> {
        let cf = self.cf_handle(CF_RESOURCES)?;
        let key = id.as_str().as_bytes();

        match self.db.get_cf(&cf, key)? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    // Reservation operations

    /// Get reservation record by ID
    pub fn get_reservation(&self, id: Uuid) -> Result<Option<Reservation>> {
        let cf = self.cf_handle(CF_RESERVATIONS)?;
        let key = id.as_bytes();

        match self.db.get_cf(&cf, key)? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    // Batch operations (atomic)

    /// Write a reservation record and its resource's adjusted capacity row
    /// as one all-or-nothing batch.
    ///
    /// Used for both confirmation and cancellation; the index entry is keyed
    /// by (requester, reservation) and rewriting it on a status change is a
    /// no-op.
    pub fn commit_reservation(&self, resource: &Resource, reservation: &Reservation) -> Result<()> {
        let mut batch = WriteBatch::default();

        // 1. Capacity row
        let cf_resources = self.cf_handle(CF_RESOURCES)?;
        let resource_key = resource.id.as_str().as_bytes();
        let resource_value = bincode::serialize(resource)?;
        batch.put_cf(&cf_resources, resource_key, &resource_value);

        // 2. Reservation record
        let cf_reservations = self.cf_handle(CF_RESERVATIONS)?;
        let reservation_key = reservation.id.as_bytes();
        let reservation_value = bincode::serialize(reservation)?;
        batch.put_cf(&cf_reservations, reservation_key, &reservation_value);

        // 3. Index: requester_id || '|' || reservation_id -> empty
        let cf_index = self.cf_handle(CF_REQUESTER_INDEX)?;
        let idx_requester = Self::index_key(&reservation.requester_id, reservation.id);
        batch.put_cf(&cf_index, &idx_requester, &[]);

        // Atomic commit
        self.db.write_opt(batch, &self.write_options())?;

        tracing::debug!(
            reservation_id = %reservation.id,
            resource_id = %reservation.resource_id,
            status = ?reservation.status,
            available = resource.available_seats,
            "Reservation committed"
        );

        Ok(())
    }

    // Listing

    /// Lazily iterate one requester's reservations in creation order.
    ///
    /// Reservation IDs are UUIDv7, so index key order is creation order.
    pub fn reservations_by_requester(
        &self,
        requester: &RequesterId,
    ) -> Result<ReservationIter<'_>> {
        let cf = self.cf_handle(CF_REQUESTER_INDEX)?;
        let prefix = Self::index_prefix(requester);

        let inner = self
            .db
            .iterator_cf(&cf, IteratorMode::From(&prefix, Direction::Forward));

        Ok(ReservationIter {
            storage: self,
            inner,
            prefix,
        })
    }

    // Index key helpers

    fn index_prefix(requester: &RequesterId) -> Vec<u8> {
        let mut key = requester.as_str().as_bytes().to_vec();
        key.push(INDEX_SEPARATOR);
        key
    }

    fn index_key(requester: &RequesterId, reservation_id: Uuid) -> Vec<u8> {
        let mut key = Self::index_prefix(requester);
        key.extend_from_slice(reservation_id.as_bytes());
        key
    }

    // Statistics

    /// Get storage statistics
    pub fn stats(&self) -> Result<StorageStats> {
        let cf_resources = self.cf_handle(CF_RESOURCES)?;
        let cf_reservations = self.cf_handle(CF_RESERVATIONS)?;

        Ok(StorageStats {
            total_resources: self.approximate_count(&cf_resources)?,
            total_reservations: self.approximate_count(&cf_reservations)?,
        })
    }

    fn approximate_count(&self, cf: &Arc<BoundColumnFamily<'_>>) -> Result<u64> {
        // RocksDB property for approximate count
        let prop = self
            .db
            .property_int_value_cf(cf, "rocksdb.estimate-num-keys")?
            .unwrap_or(0);

        Ok(prop)
    }
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StorageStats {
    /// Approximate number of resource rows
    pub total_resources: u64,
    /// Approximate number of reservation records
    pub total_reservations: u64,
}

/// Lazy cursor over one requester's reservations, in creation order.
///
/// Yields records one at a time without materializing the full history.
/// Each pass starts from the beginning of the requester's range: obtain a
/// fresh iterator to restart.
pub struct ReservationIter<'a> {
    storage: &'a Storage,
    inner: DBIteratorWithThreadMode<'a, DB>,
    prefix: Vec<u8>,
}

impl Iterator for ReservationIter<'_> {
    type Item = Result<Reservation>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let item = self.inner.next()?;
            let (key, _) = match item {
                Ok(kv) => kv,
                Err(e) => return Some(Err(e.into())),
            };

            // Past the end of this requester's key range
            if !key.starts_with(&self.prefix) {
                return None;
            }

            // A longer requester ID can share this prefix ("a" vs "a|b");
            // its keys carry extra bytes before the reservation ID.
            if key.len() != self.prefix.len() + 16 {
                continue;
            }

            let id_bytes: [u8; 16] = match key[self.prefix.len()..].try_into() {
                Ok(bytes) => bytes,
                Err(_) => continue,
            };
            let id = Uuid::from_bytes(id_bytes);

            return Some(match self.storage.get_reservation(id) {
                Ok(Some(reservation)) => Ok(reservation),
                Ok(None) => Err(Error::InvariantViolation(format!(
                    "Index entry references missing reservation {}",
                    id
                ))),
                Err(e) => Err(e),
            });
        }
    }
}
