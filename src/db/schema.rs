/// SQL-schema för Churchlib
///
/// Valideringen i tjänstelagret körs före varje skrivning; villkoren och
/// triggrarna här fångar det som skrivs direkt mot tabellerna.

pub const SCHEMA_VERSION: i32 = 2;

pub const CREATE_TABLES: &str = r#"
-- Pastorer
CREATE TABLE IF NOT EXISTS pastors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    firstname TEXT NOT NULL,
    surname TEXT,
    title TEXT,
    email TEXT,
    phone TEXT,
    ordination_date TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    CHECK (length(trim(firstname)) > 0)
);

-- Kyrkor och församlingar (tvånivåskog)
CREATE TABLE IF NOT EXISTS churches (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    church_type TEXT NOT NULL,
    parent_church_id INTEGER,
    pastor_id INTEGER,
    city TEXT,
    address TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    FOREIGN KEY (parent_church_id) REFERENCES churches(id) ON DELETE SET NULL,
    FOREIGN KEY (pastor_id) REFERENCES pastors(id) ON DELETE SET NULL,
    CHECK (church_type IN ('church', 'congregation', 'presbyterial_congregation', 'preaching_point')),
    CHECK (church_type != 'church' OR parent_church_id IS NULL),
    CHECK (parent_church_id IS NULL OR parent_church_id != id)
);

CREATE INDEX IF NOT EXISTS idx_churches_parent ON churches(parent_church_id);

-- Moderkyrkan måste själv vara av typen 'church' (max två nivåer)
CREATE TRIGGER IF NOT EXISTS trg_churches_parent_insert
BEFORE INSERT ON churches
WHEN NEW.parent_church_id IS NOT NULL
 AND (SELECT church_type FROM churches WHERE id = NEW.parent_church_id) != 'church'
BEGIN
    SELECT RAISE(ABORT, 'parent church must be of type church');
END;

CREATE TRIGGER IF NOT EXISTS trg_churches_parent_update
BEFORE UPDATE OF parent_church_id, church_type ON churches
WHEN NEW.parent_church_id IS NOT NULL
 AND (SELECT church_type FROM churches WHERE id = NEW.parent_church_id) != 'church'
BEGIN
    SELECT RAISE(ABORT, 'parent church must be of type church');
END;

-- En kyrka med församlingar kan inte göras om till församling
CREATE TRIGGER IF NOT EXISTS trg_churches_demotion
BEFORE UPDATE OF church_type ON churches
WHEN NEW.church_type != 'church'
 AND EXISTS (SELECT 1 FROM churches WHERE parent_church_id = NEW.id)
BEGIN
    SELECT RAISE(ABORT, 'church with congregations cannot become a congregation');
END;

-- Medlemmar
CREATE TABLE IF NOT EXISTS members (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    church_id INTEGER NOT NULL,
    firstname TEXT NOT NULL,
    surname TEXT,
    national_id TEXT,
    email TEXT,
    phone TEXT,
    gender TEXT,
    birth_date TEXT,
    admission_date TEXT,
    membership_number TEXT,
    active INTEGER NOT NULL DEFAULT 1,
    disciplined INTEGER NOT NULL DEFAULT 0,
    pending_transfer INTEGER NOT NULL DEFAULT 0,
    photo_path TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    FOREIGN KEY (church_id) REFERENCES churches(id) ON DELETE RESTRICT,
    CHECK (gender IS NULL OR gender IN ('M', 'F')),
    CHECK (membership_number IS NULL OR (
        length(membership_number) = 8
        AND membership_number GLOB '[0-9][0-9][0-9][0-9][0-9][0-9][0-9][0-9]'
    )),
    UNIQUE (church_id, membership_number)
);

CREATE INDEX IF NOT EXISTS idx_members_church ON members(church_id);
CREATE INDEX IF NOT EXISTS idx_members_surname ON members(surname);

-- Familjerelationer (riktade kanter)
CREATE TABLE IF NOT EXISTS family_relationships (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    member_id INTEGER NOT NULL,
    related_member_id INTEGER NOT NULL,
    relationship_type INTEGER NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    FOREIGN KEY (member_id) REFERENCES members(id) ON DELETE CASCADE,
    FOREIGN KEY (related_member_id) REFERENCES members(id) ON DELETE CASCADE,
    CHECK (member_id != related_member_id),
    CHECK (relationship_type BETWEEN 1 AND 5),
    UNIQUE (member_id, related_member_id, relationship_type)
);

CREATE INDEX IF NOT EXISTS idx_family_member ON family_relationships(member_id);
CREATE INDEX IF NOT EXISTS idx_family_related ON family_relationships(related_member_id);

-- Migrationshistorik
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;
