//! Relational schema for shelves, crop cycles, and queue entries (schema only; DB I/O not wired).

/// Postgres layout of the persisted farm state.
pub struct PostgresSchema;

impl PostgresSchema {
    /// Returns SQL migration statements.
    ///
    /// The occupancy invariant is a table CHECK; FIFO order per
    /// shelf is `(queued_at, seq)`.
    pub fn migrations() -> &'static [&'static str] {
        &[
            r#"
CREATE TABLE IF NOT EXISTS rs_shelves (
    farm_id TEXT NOT NULL,
    rack_id TEXT NOT NULL,
    shelf_id TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('FREE', 'OCCUPIED')),
    occupant_cycle_id TEXT,
    occupied_until TIMESTAMPTZ,
    PRIMARY KEY (farm_id, rack_id, shelf_id),
    CHECK ((status = 'OCCUPIED') = (occupant_cycle_id IS NOT NULL))
);
"#,
            r#"
CREATE TABLE IF NOT EXISTS rs_crop_cycles (
    farm_id TEXT NOT NULL,
    cycle_id TEXT NOT NULL,
    crop_name TEXT NOT NULL,
    crop_variety TEXT NOT NULL DEFAULT '',
    crop_type TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL,
    shelves JSONB NOT NULL DEFAULT '[]',
    requested_shelf_count INT NOT NULL CHECK (requested_shelf_count >= 1),
    preferred_rack_id TEXT,
    preferred_shelf_id TEXT,
    growing_days INT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (farm_id, cycle_id)
);
CREATE INDEX IF NOT EXISTS idx_rs_crop_cycles_status ON rs_crop_cycles (farm_id, status);
"#,
            r#"
CREATE TABLE IF NOT EXISTS rs_queue_entries (
    farm_id TEXT NOT NULL,
    cycle_id TEXT NOT NULL,
    rack_id TEXT NOT NULL,
    shelf_id TEXT NOT NULL,
    queued_at TIMESTAMPTZ NOT NULL,
    seq BIGSERIAL NOT NULL,
    will_start_from TEXT NOT NULL DEFAULT 'TRANSPLANT',
    PRIMARY KEY (farm_id, cycle_id),
    FOREIGN KEY (farm_id, rack_id, shelf_id) REFERENCES rs_shelves (farm_id, rack_id, shelf_id)
);
CREATE INDEX IF NOT EXISTS idx_rs_queue_entries_fifo ON rs_queue_entries (farm_id, rack_id, shelf_id, queued_at, seq);
"#,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covers_every_persisted_record() {
        let sql = PostgresSchema::migrations().concat();
        for table in ["rs_shelves", "rs_crop_cycles", "rs_queue_entries"] {
            assert!(sql.contains(table), "missing {table}");
        }
        assert!(sql.contains("queued_at, seq"));
    }
}
