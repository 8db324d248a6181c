use std::fmt;

use tokio::sync::Mutex;
use tonic::{Request, Response, Status};
use tracing::warn;

use crate::converter::{convert_outcome, convert_profile};
use crate::error::ClassifyError;
use crate::grpc;
use crate::grpc::image_classifier_server::ImageClassifier;
use crate::model::Classifier;
use crate::pipeline::{InferencePipeline, Upload};

/// gRPC front end over an injected pipeline. Inference requests are served
/// one at a time.
pub struct ClassifierService<C> {
    pipeline: Mutex<InferencePipeline<C>>,
}

impl<C> fmt::Debug for ClassifierService<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifierService")
            .field("pipeline", &"InferencePipeline (not Debug)")
            .finish()
    }
}

impl<C: Classifier> ClassifierService<C> {
    pub fn new(pipeline: InferencePipeline<C>) -> Self {
        Self {
            pipeline: Mutex::new(pipeline),
        }
    }
}

fn to_status(e: ClassifyError) -> Status {
    if e.is_client_error() {
        Status::invalid_argument(e.to_string())
    } else {
        warn!(error = %e, "classification failed");
        Status::internal(format!("Classification error: {e}"))
    }
}

#[tonic::async_trait]
impl<C: Classifier + 'static> ImageClassifier for ClassifierService<C> {
    async fn classify(
        &self,
        request: Request<grpc::ClassifyRequest>,
    ) -> Result<Response<grpc::ClassifyResponse>, Status> {
        let req = request.into_inner();
        let file_name = Some(req.file_name).filter(|n| !n.is_empty());
        let upload = Upload::new(file_name, req.image_data);

        let pipeline = self.pipeline.lock().await;
        let outcome = pipeline.classify_upload(Some(&upload)).map_err(to_status)?;

        Ok(Response::new(grpc::ClassifyResponse {
            outcome: Some(convert_outcome(
                pipeline.profile(),
                &outcome,
                req.top_k as usize,
            )),
        }))
    }

    async fn describe_model(
        &self,
        _request: Request<grpc::DescribeRequest>,
    ) -> Result<Response<grpc::ModelDescription>, Status> {
        let pipeline = self.pipeline.lock().await;
        Ok(Response::new(convert_profile(
            pipeline.profile(),
            pipeline.labels(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grpc::classify_response::Outcome;
    use crate::pipeline::UPLOAD_PROMPT;
    use crate::profile::ModelProfile;
    use crate::testing::FixedClassifier;
    use image::{DynamicImage, GrayImage, Luma};
    use std::io::Cursor;

    fn service() -> ClassifierService<FixedClassifier> {
        let mut scores = vec![0.01; 10];
        scores[7] = 0.91;
        let pipeline =
            InferencePipeline::new(ModelProfile::fashion(), FixedClassifier::new(scores)).unwrap();
        ClassifierService::new(pipeline)
    }

    fn thumbnail() -> Vec<u8> {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(28, 28, Luma([40])));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[tokio::test]
    async fn empty_request_gets_prompt() {
        let resp = service()
            .classify(Request::new(grpc::ClassifyRequest::default()))
            .await
            .unwrap()
            .into_inner();
        match resp.outcome {
            Some(Outcome::Prompt(prompt)) => assert_eq!(prompt.message, UPLOAD_PROMPT),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn chess_prompt_includes_idle_video() {
        let pipeline =
            InferencePipeline::new(ModelProfile::chess(), FixedClassifier::new(vec![0.1; 6]))
                .unwrap();
        let resp = ClassifierService::new(pipeline)
            .classify(Request::new(grpc::ClassifyRequest::default()))
            .await
            .unwrap()
            .into_inner();
        match resp.outcome {
            Some(Outcome::Prompt(prompt)) => {
                assert_eq!(prompt.message, UPLOAD_PROMPT);
                assert!(prompt.idle_video.is_some_and(|v| v.url.contains("PSzQw1AnvCE")));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn thumbnail_is_classified() {
        let req = grpc::ClassifyRequest {
            image_data: thumbnail(),
            file_name: "shoe.png".to_string(),
            top_k: 3,
        };
        let resp = service().classify(Request::new(req)).await.unwrap().into_inner();
        match resp.outcome {
            Some(Outcome::Prediction(p)) => {
                assert_eq!(p.label, "Sneaker");
                assert_eq!(p.class_id, 7);
                assert_eq!(p.ranked.len(), 3);
                assert!((0.0..=1.0).contains(&p.confidence));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn bad_extension_is_invalid_argument() {
        let req = grpc::ClassifyRequest {
            image_data: thumbnail(),
            file_name: "shoe.bmp".to_string(),
            top_k: 0,
        };
        let status = service().classify(Request::new(req)).await.unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }

    #[tokio::test]
    async fn describes_loaded_profile() {
        let desc = service()
            .describe_model(Request::new(grpc::DescribeRequest {}))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(desc.name, "fashion");
        assert_eq!(desc.labels.len(), 10);
        assert_eq!(desc.input_shape, vec![1, 28, 28, 1]);
    }
}
