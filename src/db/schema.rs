pub const SCHEMA: &str = r#"
-- enumeration order for sources
CREATE TABLE IF NOT EXISTS source_keys (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE
);

-- enumeration order for articles
CREATE TABLE IF NOT EXISTS article_keys (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE
);

-- id -> record map; source_id and feed_url are lookup columns copied out of
-- the JSON record
CREATE TABLE IF NOT EXISTS entries (
    id TEXT PRIMARY KEY,
    kind TEXT NOT NULL CHECK (kind IN ('source', 'article')),
    source_id TEXT,
    feed_url TEXT,
    record TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_entries_feed_url ON entries(feed_url) WHERE feed_url IS NOT NULL;
CREATE INDEX IF NOT EXISTS idx_entries_source_id ON entries(source_id);
"#;
