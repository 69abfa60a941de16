//! NSKeyedArchiver archive keys and class names.

pub const ARCHIVER: &str = "NSKeyedArchiver";
pub const ARCHIVER_VERSION: i64 = 100_000;

pub const VERSION_KEY: &str = "$version";
pub const ARCHIVER_KEY: &str = "$archiver";
pub const TOP_KEY: &str = "$top";
pub const OBJECTS_KEY: &str = "$objects";
pub const ROOT_KEY: &str = "root";

/// Contents of `$objects[0]`, the slot every nil reference points at.
pub const NULL_OBJECT: &str = "$null";

pub const CLASS_KEY: &str = "$class";
pub const CLASSNAME_KEY: &str = "$classname";
pub const CLASSES_KEY: &str = "$classes";

pub const NS_KEYS: &str = "NS.keys";
pub const NS_OBJECTS: &str = "NS.objects";
pub const NS_TIME: &str = "NS.time";
pub const NS_STRING: &str = "NS.string";
pub const NS_DATA: &str = "NS.data";

pub const DEFAULT_MAX_DEPTH: usize = 512;

pub mod class {
    pub const NS_OBJECT: &str = "NSObject";
    pub const NS_DICTIONARY: &str = "NSDictionary";
    pub const NS_ARRAY: &str = "NSArray";
    pub const NS_SET: &str = "NSSet";
    pub const NS_DATE: &str = "NSDate";
    pub const NS_STRING: &str = "NSString";
    pub const NS_DATA: &str = "NSData";
}
