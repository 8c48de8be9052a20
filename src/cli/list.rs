use table::{Align, IntoTable, Table};
mod table;

use crate::{
    availability::{self, AvailableModels, ModelAvailabilityCache},
    cache::ModelEntry,
    cli::availability_cache,
    config::Config,
    die, warn, ListArgs, ListObject, ListingFormat,
};

#[derive(serde::Serialize)]
struct ListedModel {
    model: String,
    service: String,
    /// `null` for models of a single-service query, which are not ranked
    index: Option<usize>,
}

impl From<ModelEntry> for ListedModel {
    fn from(value: ModelEntry) -> Self {
        ListedModel {
            model: value.model_name,
            service: value.service_name,
            index: value.index,
        }
    }
}

impl From<Vec<ListedModel>> for Table {
    fn from(value: Vec<ListedModel>) -> Self {
        let mut tab = Table::new();

        tab.set_header(vec!["INDEX", "MODEL", "SERVICE"]);
        tab.align(0, Align::Right);

        for model in value {
            tab.add_row(vec![
                match model.index {
                    Some(index) => index.to_string(),
                    None => "-".to_string(),
                },
                model.model,
                model.service,
            ]);
        }

        tab
    }
}

#[derive(serde::Serialize)]
struct Service {
    service: String,
    added_models: usize,
}

impl From<Vec<Service>> for Table {
    fn from(value: Vec<Service>) -> Self {
        let mut tab = Table::new();

        tab.set_header(vec!["SERVICE", "ADDED_MODELS"]);
        tab.align(1, Align::Right);

        for service in value {
            tab.add_row(vec![service.service, service.added_models.to_string()]);
        }

        tab
    }
}

fn get_services(cache: &ModelAvailabilityCache, config: &Config) -> Vec<Service> {
    cache
        .registry()
        .service_names()
        .map(|name| Service {
            service: name.to_string(),
            added_models: config.added_models.get(name).map_or(0, |m| m.len()),
        })
        .collect()
}

async fn get_models(cache: &ModelAvailabilityCache, service: Option<&str>) -> Vec<ListedModel> {
    match cache.list_available_models(service).await {
        Ok(models) => models.into_iter().map(ListedModel::from).collect(),
        Err(availability::Error::UnknownService(name)) => {
            let known: Vec<&str> = cache.registry().service_names().collect();

            die!(
                "failed to list models: service \"{}\" is not enabled (enabled: {})",
                name,
                if known.is_empty() {
                    "none".to_string()
                } else {
                    known.join(", ")
                }
            );
        }
        Err(err) => die!("failed to list models: {}", err),
    }
}

/// The entries for `model`, or `None` if no service offers it.
fn offering_model(models: &AvailableModels, model: &str) -> Option<Vec<ListedModel>> {
    if !models.contains(model) {
        return None;
    }

    Some(
        models
            .offering(model)
            .cloned()
            .map(ListedModel::from)
            .collect(),
    )
}

async fn find_model(cache: &ModelAvailabilityCache, model: &str) -> Vec<ListedModel> {
    let models = match cache.available_models().await {
        Ok(models) => models,
        Err(err) => die!("failed to list models: {}", err),
    };

    match offering_model(&models, model) {
        Some(listed) => listed,
        None => die!("model \"{}\" is not offered by any enabled service", model),
    }
}

pub(crate) fn format_output<O: IntoTable + serde::Serialize>(object: O, format: ListingFormat) {
    match format {
        ListingFormat::Json => match serde_json::to_string_pretty(&object) {
            Ok(output) => println!("{}", output),
            Err(err) => die!("failed to serialize the listing: {}", err),
        },
        ListingFormat::Table => {
            let tab = object.into_table();

            print!("{}", tab);
        }
        ListingFormat::HeaderlessTable => {
            let mut tab = object.into_table();

            tab.print_header(false);

            print!("{}", tab);
        }
    }
}

pub(crate) async fn list_cmd(config: &Config, args: &ListArgs) {
    let format = args.format;

    match &args.object {
        ListObject::Models(models_args) => {
            let cache = availability_cache(config, !models_args.no_cache).await;

            if cache.registry().is_empty() {
                warn!("no services are enabled, configure a provider to list its models");
            }

            let models = match &models_args.contains {
                Some(model) => find_model(&cache, model).await,
                None => get_models(&cache, models_args.service.as_deref()).await,
            };

            format_output(models, format);
        }
        ListObject::Providers => {
            let cache = availability_cache(config, true).await;

            format_output(get_services(&cache, config), format);
        }
    }
}
