pub const SCHEMA: &str = include_str!("../../../migrations/0001_init.sql");

const TAG_WITH_PET_COLUMNS: &str = r#"
SELECT
    t.id,t.code,t.activated,t.activated_at,t.pet_id,t.user_id,t.has_nfc,t.created_at,
    p.id AS p_id,p.name AS p_name,p.type AS p_type,p.breed AS p_breed,
    p.owner_name AS p_owner_name,p.owner_contact AS p_owner_contact,
    p.owner_phone AS p_owner_phone,p.notes AS p_notes,p.qr_activated AS p_qr_activated,
    p.user_id AS p_user_id,p.created_at AS p_created_at,p.updated_at AS p_updated_at
FROM tags t
LEFT JOIN pets p ON (p.id = t.pet_id)
"#;

pub fn query_get_tags_by_code() -> String {
    format!("{TAG_WITH_PET_COLUMNS} WHERE t.code = $1;")
}

pub fn query_get_tags_by_code_like() -> String {
    format!("{TAG_WITH_PET_COLUMNS} WHERE t.code LIKE $1 ESCAPE '\\';")
}

pub const QUERY_SEARCH_TAG_CODES: &str = r#"
SELECT code FROM tags
WHERE code LIKE '%' || $1 || '%' ESCAPE '\'
ORDER BY code
LIMIT $2;
"#;

pub const QUERY_HAS_ANY_TAG: &str = r#"SELECT EXISTS(SELECT 1 FROM tags);"#;

pub const QUERY_GET_TAG_BY_ID: &str = r#"
SELECT id,code,activated,activated_at,pet_id,user_id,has_nfc,created_at
FROM tags WHERE id = $1;
"#;

pub const QUERY_GET_ALL_TAGS: &str = r#"
SELECT id,code,activated,activated_at,pet_id,user_id,has_nfc,created_at
FROM tags ORDER BY created_at DESC, code;
"#;

pub const QUERY_INSERT_TAG: &str = r#"
INSERT INTO tags(id,code,activated,activated_at,pet_id,user_id,has_nfc,created_at)
VALUES($1,$2,$3,$4,$5,$6,$7,$8);
"#;

pub const QUERY_DELETE_UNCLAIMED_TAG: &str = r#"
DELETE FROM tags
WHERE id = $1 AND activated = 0 AND pet_id IS NULL AND user_id IS NULL;
"#;

pub const QUERY_LINK_TAG_TO_PET: &str = r#"
UPDATE tags SET pet_id=$2, user_id=$3, activated=1, activated_at=$4
WHERE id = $1 AND (user_id IS NULL OR user_id = $3)
    AND (activated = 0 OR user_id = $3 OR pet_id IS NULL OR pet_id NOT IN (SELECT id FROM pets));
"#;

pub const QUERY_UNLINK_PET_TAGS: &str = r#"
UPDATE tags SET pet_id=NULL, user_id=NULL, activated=0, activated_at=NULL
WHERE pet_id = $1 AND user_id = $2;
"#;

pub const QUERY_GET_PET_BY_ID: &str = r#"
SELECT id,name,type,breed,owner_name,owner_contact,owner_phone,notes,qr_activated,
    user_id,created_at,updated_at
FROM pets WHERE id = $1;
"#;

pub const QUERY_GET_PETS_BY_USER: &str = r#"
SELECT id,name,type,breed,owner_name,owner_contact,owner_phone,notes,qr_activated,
    user_id,created_at,updated_at
FROM pets WHERE user_id = $1
ORDER BY created_at DESC;
"#;

pub const QUERY_GET_TAGS_BY_USER: &str = r#"
SELECT id,code,activated,activated_at,pet_id,user_id,has_nfc,created_at
FROM tags WHERE user_id = $1 ORDER BY code;
"#;

pub const QUERY_INSERT_PET: &str = r#"
INSERT INTO pets (
    id,name,type,breed,owner_name,owner_contact,owner_phone,notes,
    qr_activated,user_id,created_at,updated_at
) VALUES($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12);
"#;

pub const QUERY_UPDATE_PET: &str = r#"
UPDATE pets SET
    name=$3,type=$4,breed=$5,owner_name=$6,owner_contact=$7,owner_phone=$8,
    notes=$9,qr_activated=$10,updated_at=$11
WHERE id = $1 AND user_id = $2;
"#;

pub const QUERY_DELETE_PET: &str = r#"DELETE FROM pets WHERE id = $1 AND user_id = $2;"#;

pub const QUERY_GET_USER_BY_ID: &str = r#"
SELECT id,email,full_name,phone,account_role,created_at,updated_at
FROM users WHERE id = $1;
"#;

pub const QUERY_GET_USER_BY_EMAIL: &str = r#"
SELECT id,email,full_name,phone,account_role,created_at,updated_at
FROM users WHERE email = $1;
"#;

pub const QUERY_LIST_USERS: &str = r#"
SELECT id,email,full_name,phone,account_role,created_at,updated_at
FROM users ORDER BY created_at DESC;
"#;

pub const QUERY_UPSERT_USER: &str = r#"
INSERT INTO users(id,email,full_name,phone,account_role,created_at,updated_at)
VALUES($1,$2,$3,$4,$5,$6,$7)
ON CONFLICT(id) DO UPDATE SET
    email=excluded.email,
    full_name=excluded.full_name,
    phone=excluded.phone,
    updated_at=excluded.updated_at;
"#;

pub const QUERY_SEARCH_USER_EMAILS: &str = r#"
SELECT email FROM users
WHERE email LIKE '%' || $1 || '%' ESCAPE '\'
ORDER BY email
LIMIT $2;
"#;

pub const QUERY_USER_COUNTS: &str = r#"
SELECT
    (SELECT COUNT(*) FROM pets WHERE user_id = $1) AS pets_count,
    (SELECT COUNT(*) FROM tags WHERE user_id = $1) AS tags_count;
"#;

pub const QUERY_ADMIN_STATS: &str = r#"
SELECT
    (SELECT COUNT(*) FROM tags) AS total_tags,
    (SELECT COUNT(*) FROM tags WHERE activated = 1) AS activated_tags,
    (SELECT COUNT(*) FROM tags WHERE activated = 0 AND user_id IS NULL) AS unclaimed_tags,
    (SELECT COUNT(*) FROM tags WHERE activated = 0 AND user_id IS NOT NULL) AS claimed_not_completed_tags,
    (SELECT COUNT(*) FROM pets) AS total_pets,
    (SELECT COUNT(*) FROM users) AS total_users;
"#;

pub const QUERY_INTEGRITY_CANDIDATES: &str = r#"
SELECT
    t.id,t.code,t.pet_id,t.user_id,
    p.user_id AS pet_owner,
    CASE WHEN u.id IS NOT NULL THEN 1 ELSE 0 END AS user_exists,
    CASE WHEN po.id IS NOT NULL THEN 1 ELSE 0 END AS pet_owner_exists
FROM tags t
LEFT JOIN pets p ON (p.id = t.pet_id)
LEFT JOIN users u ON (u.id = t.user_id)
LEFT JOIN users po ON (po.id = p.user_id)
WHERE t.activated = 1
ORDER BY t.code;
"#;

pub const QUERY_DEACTIVATE_ORPHANED_TAG: &str = r#"
UPDATE tags SET activated=0, pet_id=NULL, activated_at=NULL
WHERE id = $1 AND activated = 1;
"#;

pub const QUERY_SET_TAG_OWNER: &str = r#"
UPDATE tags SET user_id=$2
WHERE id = $1 AND activated = 1;
"#;

pub const QUERY_MARK_TAG_NFC: &str = r#"UPDATE tags SET has_nfc=$2 WHERE code = $1;"#;

pub const QUERY_NFC_STATS: &str = r#"
SELECT
    COALESCE(SUM(CASE WHEN has_nfc = 1 THEN 1 ELSE 0 END), 0) AS nfc_tags,
    COALESCE(SUM(CASE WHEN has_nfc = 1 AND activated = 1 THEN 1 ELSE 0 END), 0) AS activated_nfc_tags
FROM tags;
"#;

pub const INSERT_AUTH_USER: &str = r#"
    INSERT INTO auth_users (id, email, password_hash, user_metadata, created_at)
    VALUES ($1, $2, $3, $4, $5);
"#;

pub const GET_AUTH_USER_BY_EMAIL: &str = r#"
    SELECT id, email, password_hash, user_metadata
    FROM auth_users
    WHERE email = $1;
"#;

pub const INSERT_AUTH_SESSION: &str = r#"
    INSERT INTO auth_sessions (token, user_id, created_at)
    VALUES ($1, $2, $3);
"#;

pub const GET_AUTH_USER_BY_SESSION: &str = r#"
    SELECT u.id, u.email, u.password_hash, u.user_metadata
    FROM auth_sessions s
    JOIN auth_users u ON u.id = s.user_id
    WHERE s.token = $1;
"#;

pub const DELETE_AUTH_SESSION: &str = r#"
    DELETE FROM auth_sessions WHERE token = $1;
"#;
