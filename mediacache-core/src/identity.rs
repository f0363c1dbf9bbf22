//! Identity types and well-known names for media entities

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Integer identifier of a media node in the persistent store.
pub type MediaId = i32;

/// Integer identifier of a back-office user.
pub type UserId = i32;

/// Globally unique key of a media node.
pub type MediaKey = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Parent id carried by every top-level media node.
pub const ROOT_PARENT_ID: MediaId = -1;

/// Search scope (index type) that media rows are indexed under.
pub const MEDIA_SEARCH_SCOPE: &str = "media";

/// Ancestor-path prefix of everything that lives in the media recycle bin.
pub const RECYCLE_BIN_PATH_PREFIX: &str = "/-1/-21/";

/// Format used for audit dates in canonical value maps.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Field names used in canonical value maps and search rows.
pub mod fields {
    pub const ID: &str = "id";
    pub const KEY: &str = "key";
    pub const PARENT_ID: &str = "parentID";
    pub const LEVEL: &str = "level";
    pub const PATH: &str = "path";
    pub const NODE_NAME: &str = "nodeName";
    pub const NODE_TYPE: &str = "nodeType";
    pub const NODE_TYPE_ALIAS: &str = "nodeTypeAlias";
    pub const SORT_ORDER: &str = "sortOrder";
    pub const CREATOR_ID: &str = "creatorID";
    pub const CREATOR_NAME: &str = "creatorName";
    pub const WRITER_ID: &str = "writerID";
    pub const WRITER_NAME: &str = "writerName";
    pub const TEMPLATE: &str = "template";
    pub const URL_NAME: &str = "urlName";
    pub const CREATE_DATE: &str = "createDate";
    pub const UPDATE_DATE: &str = "updateDate";

    /// Node id field written by the current indexer.
    pub const INDEX_NODE_ID: &str = "__NodeId";
    /// Node id field written by older indexers.
    pub const LEGACY_NODE_ID: &str = "NodeId";
    /// Ancestor path as stored in the index.
    pub const INDEX_PATH: &str = "__Path";
    /// Prefix of fields that hold the unprocessed value of a property.
    pub const RAW_PREFIX: &str = "__Raw_";

    /// Keys that every successfully normalized value map carries.
    pub const REQUIRED: [&str; 7] = [ID, KEY, PARENT_ID, LEVEL, PATH, NODE_TYPE_ALIAS, SORT_ORDER];

    /// Keys describing the node itself rather than a user-defined property.
    pub const SYSTEM: [&str; 17] = [
        ID,
        KEY,
        PARENT_ID,
        LEVEL,
        PATH,
        NODE_NAME,
        NODE_TYPE,
        NODE_TYPE_ALIAS,
        SORT_ORDER,
        CREATOR_ID,
        CREATOR_NAME,
        WRITER_ID,
        WRITER_NAME,
        TEMPLATE,
        URL_NAME,
        CREATE_DATE,
        UPDATE_DATE,
    ];
}

/// The `/id/` marker that identifies `id` as a segment of a stored path.
pub fn path_segment(id: MediaId) -> String {
    format!("/{}/", id)
}
