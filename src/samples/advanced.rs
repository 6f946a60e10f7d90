//! Advanced samples: enumeration, service properties, metadata round trips.

use std::io::Write;

use crate::lifecycle::{Lifecycle, SetupFn, Step, TeardownFn};
use crate::samples::{ignore_missing, verify, write_outcome, SampleError, StepError};
use crate::store::{
    CorsRule, DirectoryRef, FileRef, FileStore, Metadata, MetricsPolicy, RetentionPolicy,
    ServiceProperties, ServicePropertiesUpdate, ShareOptions, ShareRef, unique_name,
};

const ENUMERATED_SHARES: usize = 5;
const METRICS_RETENTION_DAYS: u32 = 5;
const SAMPLE_FILE_NAME: &str = "sample.txt";
const SAMPLE_FILE_CONTENT: &[u8] = b"Hello World! - from text sample";

/// Runs the advanced flows, each as its own lifecycle run, in fixed order.
pub struct AdvancedSamples<S> {
    lifecycle: Lifecycle<S>,
    prefix: String,
}

impl<S> AdvancedSamples<S>
where
    S: FileStore + Clone + Send + Sync + 'static,
{
    /// Creates the sample group against `store`, naming its shares with
    /// `prefix`.
    #[must_use]
    pub fn new(store: S, prefix: impl Into<String>) -> Self {
        Self {
            lifecycle: Lifecycle::new(store),
            prefix: prefix.into(),
        }
    }

    /// Runs share enumeration, CORS, metrics and metadata samples in order.
    /// The runs are independent: a failing one never skips those after it.
    ///
    /// # Errors
    ///
    /// Returns [`SampleError::Lifecycle`] for the earliest failing run, after
    /// every run has been attempted, and [`SampleError::Report`] when the
    /// report sink rejects a write.
    pub async fn run(&self, report: &mut dyn Write) -> Result<(), SampleError> {
        let outcomes = [
            self.share_enumeration(report).await,
            self.cors_rules(report).await,
            self.metrics_and_retention(report).await,
            self.metadata_and_properties(report).await,
        ];
        let mut first_failure = None;
        for outcome in outcomes {
            if let Err(err) = outcome
                && first_failure.is_none()
            {
                first_failure = Some(err);
            }
        }
        first_failure.map_or(Ok(()), Err)
    }

    async fn share_enumeration(&self, report: &mut dyn Write) -> Result<(), SampleError> {
        const NAME: &str = "share enumeration";
        let enumeration_prefix = unique_name(&self.prefix);
        let names: Vec<String> = (0..ENUMERATED_SHARES)
            .map(|index| format!("{enumeration_prefix}{index}"))
            .collect();
        writeln!(report, "{NAME}: prefix '{enumeration_prefix}'")?;

        let setup: SetupFn<S, Vec<ShareRef>, StepError> = {
            let wanted = names.clone();
            Box::new(move |store: S| {
                Box::pin(async move {
                    let mut created = Vec::with_capacity(wanted.len());
                    for name in &wanted {
                        match store.create_share(name, &ShareOptions::default()).await {
                            Ok(share) => created.push(share),
                            Err(err) => {
                                for share in &created {
                                    store.delete_share(share).await.ok();
                                }
                                return Err(err.into());
                            }
                        }
                    }
                    Ok(created)
                })
            })
        };

        let list_step = Step::new("list shares by prefix", {
            move |store: S, _: Vec<ShareRef>| {
                Box::pin(async move {
                    let listed: Vec<String> = store
                        .list_shares(Some(&enumeration_prefix))
                        .await?
                        .collect();
                    for name in &names {
                        if !listed.contains(name) {
                            return Err(StepError::Verification(format!(
                                "listing is missing share '{name}'"
                            )));
                        }
                    }
                    Ok(listed)
                })
            }
        });

        let teardown: TeardownFn<S, Vec<ShareRef>, StepError> =
            Box::new(move |store: S, shares: Vec<ShareRef>| {
                Box::pin(async move {
                    for share in &shares {
                        ignore_missing(store.delete_share(share).await)?;
                    }
                    Ok(())
                })
            });

        self.run_one(NAME, report, setup, vec![list_step], teardown)
            .await
    }

    async fn cors_rules(&self, report: &mut dyn Write) -> Result<(), SampleError> {
        const NAME: &str = "cors rules";
        writeln!(report, "{NAME}:")?;

        let overwrite_step = Step::new("overwrite cors rules", {
            |store: S, _: ServiceProperties| {
                Box::pin(async move {
                    let rule = permissive_cors_rule();
                    store
                        .set_service_properties(
                            &ServicePropertiesUpdate::new().with_cors(vec![rule.clone()]),
                        )
                        .await?;
                    let current = store.service_properties().await?;
                    verify("cors rules", &vec![rule], &current.cors)?;
                    Ok(vec![String::from(
                        "replaced cors rules with one permissive rule",
                    )])
                })
            }
        });

        let teardown: TeardownFn<S, ServiceProperties, StepError> =
            Box::new(|store: S, snapshot: ServiceProperties| {
                Box::pin(async move {
                    store
                        .set_service_properties(
                            &ServicePropertiesUpdate::new().with_cors(snapshot.cors),
                        )
                        .await?;
                    Ok(())
                })
            });

        self.run_one(NAME, report, snapshot_setup(), vec![overwrite_step], teardown)
            .await
    }

    async fn metrics_and_retention(&self, report: &mut dyn Write) -> Result<(), SampleError> {
        const NAME: &str = "metrics and retention";
        writeln!(report, "{NAME}:")?;

        let overwrite_step = Step::new("overwrite metrics policies", {
            |store: S, _: ServiceProperties| {
                Box::pin(async move {
                    let hour = MetricsPolicy {
                        enabled: true,
                        include_apis: true,
                        retention: RetentionPolicy {
                            enabled: true,
                            days: METRICS_RETENTION_DAYS,
                        },
                    };
                    let minute = MetricsPolicy::default();
                    store
                        .set_service_properties(
                            &ServicePropertiesUpdate::new()
                                .with_hour_metrics(hour)
                                .with_minute_metrics(minute),
                        )
                        .await?;
                    let current = store.service_properties().await?;
                    verify("hour metrics", &hour, &current.hour_metrics)?;
                    verify("minute metrics", &minute, &current.minute_metrics)?;
                    Ok(vec![format!(
                        "enabled hour metrics with {METRICS_RETENTION_DAYS} day retention, \
                         disabled minute metrics"
                    )])
                })
            }
        });

        let teardown: TeardownFn<S, ServiceProperties, StepError> =
            Box::new(|store: S, snapshot: ServiceProperties| {
                Box::pin(async move {
                    store
                        .set_service_properties(
                            &ServicePropertiesUpdate::new()
                                .with_hour_metrics(snapshot.hour_metrics)
                                .with_minute_metrics(snapshot.minute_metrics),
                        )
                        .await?;
                    Ok(())
                })
            });

        self.run_one(NAME, report, snapshot_setup(), vec![overwrite_step], teardown)
            .await
    }

    async fn metadata_and_properties(&self, report: &mut dyn Write) -> Result<(), SampleError> {
        const NAME: &str = "metadata and properties";
        let share_name = unique_name(&self.prefix);
        let directory_name = unique_name("dirname");
        writeln!(report, "{NAME}: share '{share_name}'")?;

        let share_metadata = Metadata::from_pairs([("foo", "bar"), ("baz", "foo")]);
        let directory_metadata = Metadata::from_pairs([("abc", "def"), ("jkl", "mno")]);
        let file_metadata = Metadata::from_pairs([("prop1", "val1"), ("prop2", "val2")]);

        let setup: SetupFn<S, ShareRef, StepError> = {
            let metadata = share_metadata.clone();
            Box::new(move |store: S| {
                Box::pin(async move {
                    let options = ShareOptions::builder()
                        .metadata(metadata)
                        .quota_gb(1)
                        .build()?;
                    let share = store.create_share(&share_name, &options).await?;
                    Ok(share)
                })
            })
        };

        let share_step = Step::new("verify share metadata", {
            let expected = share_metadata;
            move |store: S, share: ShareRef| {
                Box::pin(async move {
                    let properties = store.share_properties(&share).await?;
                    verify("share metadata", &expected, &properties.metadata)?;
                    verify("share quota", &Some(1), &properties.quota_gb)?;
                    Ok(metadata_notes(&properties.metadata))
                })
            }
        });

        let directory_step = Step::new("create directory and verify metadata", {
            let expected = directory_metadata;
            let path = directory_name.clone();
            move |store: S, share: ShareRef| {
                Box::pin(async move {
                    let directory = store
                        .create_directory(&share, &path, &expected)
                        .await?;
                    let properties = store.directory_properties(&directory).await?;
                    verify("directory metadata", &expected, &properties.metadata)?;
                    Ok(metadata_notes(&properties.metadata))
                })
            }
        });

        let file_step = Step::new("upload file and verify metadata", {
            let expected = file_metadata;
            let path = directory_name.clone();
            move |store: S, share: ShareRef| {
                Box::pin(async move {
                    let directory = DirectoryRef::new(&share, &path);
                    let file = FileRef::in_directory(&directory, SAMPLE_FILE_NAME);
                    store
                        .upload_file(&file, SAMPLE_FILE_CONTENT, &expected)
                        .await?;
                    let properties = store.file_properties(&file).await?;
                    verify("file metadata", &expected, &properties.metadata)?;
                    Ok(metadata_notes(&properties.metadata))
                })
            }
        });

        let delete_step = Step::new("delete file and directory", {
            move |store: S, share: ShareRef| {
                Box::pin(async move {
                    let directory = DirectoryRef::new(&share, &directory_name);
                    let file = FileRef::in_directory(&directory, SAMPLE_FILE_NAME);
                    store.delete_file(&file).await?;
                    store.delete_directory(&directory).await?;
                    Ok(vec![String::from("deleted the file and its directory")])
                })
            }
        });

        let teardown: TeardownFn<S, ShareRef, StepError> =
            Box::new(|store: S, share: ShareRef| {
                Box::pin(async move {
                    store.delete_share(&share).await?;
                    Ok(())
                })
            });

        self.run_one(
            NAME,
            report,
            setup,
            vec![share_step, directory_step, file_step, delete_step],
            teardown,
        )
        .await
    }

    async fn run_one<H>(
        &self,
        name: &str,
        report: &mut dyn Write,
        setup: SetupFn<S, H, StepError>,
        steps: Vec<Step<S, H, StepError>>,
        teardown: TeardownFn<S, H, StepError>,
    ) -> Result<(), SampleError>
    where
        H: Clone,
    {
        let outcome = self
            .lifecycle
            .run(setup, steps, teardown)
            .await
            .map_err(|source| SampleError::Lifecycle {
                name: name.to_owned(),
                source,
            })?;
        write_outcome(report, &outcome)?;
        Ok(())
    }
}

/// Setup for the service-properties samples: the handle is a snapshot the
/// teardown restores.
fn snapshot_setup<S>() -> SetupFn<S, ServiceProperties, StepError>
where
    S: FileStore + Clone + Send + Sync + 'static,
{
    Box::new(|store: S| {
        Box::pin(async move {
            let snapshot = store.service_properties().await?;
            Ok(snapshot)
        })
    })
}

fn permissive_cors_rule() -> CorsRule {
    CorsRule {
        allowed_origins: vec![String::from("*")],
        allowed_methods: vec![String::from("POST"), String::from("GET")],
        allowed_headers: vec![String::from("*")],
        exposed_headers: vec![String::from("*")],
        max_age_secs: 3600,
    }
}

fn metadata_notes(metadata: &Metadata) -> Vec<String> {
    metadata
        .iter()
        .map(|(key, value)| format!("{key}: {value}"))
        .collect()
}
