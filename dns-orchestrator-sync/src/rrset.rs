//! RecordSet 模型：与线上格式、扁平记录之间的转换以及 TTL 合并策略

use std::time::Duration;

use crate::types::{
    MIN_TTL, Record, RecordSet, RecordSetKey, RecordSets, WireRecord, WireRecordSet,
};
use crate::utils::names::{absolute_name, relative_name};

/// Combine TTL requirements into the effective TTL of one record set.
///
/// Every value is first raised to [`MIN_TTL`]; the smallest result wins.
/// Zero means "unspecified" and does not take part. With nothing taking part
/// the floor applies.
///
/// ```rust
/// use std::time::Duration;
/// use dns_orchestrator_sync::merge_ttl;
///
/// let s = Duration::from_secs;
/// assert_eq!(merge_ttl([s(90), s(30)]), s(60));
/// assert_eq!(merge_ttl([s(120), s(180)]), s(120));
/// assert_eq!(merge_ttl([s(10), s(20)]), s(60));
/// ```
pub fn merge_ttl<I>(ttls: I) -> Duration
where
    I: IntoIterator<Item = Duration>,
{
    ttls.into_iter()
        .filter(|ttl| !ttl.is_zero())
        .map(|ttl| ttl.max(MIN_TTL))
        .min()
        .unwrap_or(MIN_TTL)
}

impl RecordSet {
    /// Empty record set, not yet created remotely.
    pub fn new(key: RecordSetKey, ttl: Duration) -> Self {
        Self {
            key,
            ttl: merge_ttl([ttl]),
            ..Self::default()
        }
    }

    /// 从线上格式转换，名称转为相对于 zone 的形式
    pub fn from_wire(raw: &WireRecordSet, zone: &str) -> Self {
        let mut set = Self::new(
            RecordSetKey::new(relative_name(&raw.name, zone), raw.record_type.clone()),
            Duration::from_secs(u64::from(raw.ttl)),
        );
        set.id.clone_from(&raw.id);

        for record in &raw.records {
            if record.disabled {
                if !set.enabled.contains(&record.content) {
                    set.disabled.insert(record.content.clone());
                }
            } else {
                set.enable(record.content.clone());
            }
        }

        set
    }

    /// 转换为线上格式，名称转为绝对形式，记录按内容排序
    pub fn to_wire(&self, zone: &str) -> WireRecordSet {
        let mut records: Vec<WireRecord> = self
            .enabled
            .iter()
            .map(|content| WireRecord {
                content: content.clone(),
                disabled: false,
            })
            .chain(self.disabled.iter().map(|content| WireRecord {
                content: content.clone(),
                disabled: true,
            }))
            .collect();
        records.sort();

        WireRecordSet {
            id: self.id.clone(),
            name: absolute_name(&self.key.name, zone),
            record_type: self.key.record_type.clone(),
            ttl: u32::try_from(merge_ttl([self.ttl]).as_secs()).unwrap_or(u32::MAX),
            records,
        }
    }

    /// One flat record per enabled value, using the set TTL.
    pub fn to_records(&self) -> Vec<Record> {
        self.records_with(self.enabled.iter(), self.ttl)
    }

    /// Flat records for `values` under this set's key.
    pub(crate) fn records_with<'a, I>(&self, values: I, ttl: Duration) -> Vec<Record>
    where
        I: IntoIterator<Item = &'a String>,
    {
        values
            .into_iter()
            .map(|data| {
                Record::new(
                    self.key.name.clone(),
                    self.key.record_type.clone(),
                    ttl,
                    data.clone(),
                )
            })
            .collect()
    }

    /// Mark `value` as live, taking it out of the disabled set if needed.
    ///
    /// Returns `false` if the value was already enabled.
    pub fn enable(&mut self, value: String) -> bool {
        self.disabled.remove(&value);
        self.enabled.insert(value)
    }

    /// Whether the set holds any value, enabled or disabled.
    pub fn has_values(&self) -> bool {
        !self.enabled.is_empty() || !self.disabled.is_empty()
    }

    /// Enabled and disabled values never overlap.
    pub fn is_consistent(&self) -> bool {
        self.enabled.is_disjoint(&self.disabled)
    }
}

/// 将扁平记录按 `(name, type)` 分组
///
/// TTL 取同组所有 TTL 的合并值，所有值都进入 `enabled`。
/// A group whose records all leave the TTL unspecified keeps a zero TTL, so
/// planning can fall back to the existing set's TTL; [`RecordSet::to_wire`]
/// floors it for creates. Records with an empty value are ignored, so a key
/// with only such records never appears in the result.
pub fn record_sets_from_records(records: &[Record]) -> RecordSets {
    let mut sets = RecordSets::new();

    for record in records.iter().filter(|r| !r.data.is_empty()) {
        let set = sets
            .entry(record.key())
            .or_insert_with_key(|key| RecordSet {
                key: key.clone(),
                ..RecordSet::default()
            });
        if !record.ttl.is_zero() {
            set.ttl = merge_ttl([set.ttl, record.ttl]);
        }
        set.enabled.insert(record.data.clone());
    }

    sets
}
