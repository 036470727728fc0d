pub const SCHEMA_SQL: &str = "\
CREATE TABLE IF NOT EXISTS documents (
	id UUID PRIMARY KEY,
	kind TEXT NOT NULL,
	fields JSONB NOT NULL DEFAULT '{}'::jsonb,
	created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
	updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS idx_documents_kind ON documents (kind);

CREATE INDEX IF NOT EXISTS idx_documents_ref_event ON documents (kind, (fields->>'event'));

CREATE INDEX IF NOT EXISTS idx_documents_date ON documents (kind, (fields->>'date'));
";
