use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig},
        BatchNorm, BatchNormConfig,
        Linear, LinearConfig,
        PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::relu,
};

use crate::ml::backbone::Featurize;

/// Stage widths relative to `base_width`, and their first-block strides.
const STAGE_WIDTHS:  [usize; 4] = [1, 2, 4, 8];
const STAGE_STRIDES: [usize; 4] = [1, 2, 2, 2];

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct ResNetConfig {
    /// Residual blocks in each of the four stages
    pub blocks: [usize; 4],
    #[config(default = 64)]
    pub base_width: usize,
    #[config(default = 3)]
    pub in_channels: usize,
}

impl ResNetConfig {
    pub fn resnet10() -> Self {
        Self::new([1, 1, 1, 1])
    }

    pub fn resnet18() -> Self {
        Self::new([2, 2, 2, 2])
    }

    /// Conventional name, counting weighted layers: "ResNet10", "ResNet18", ...
    pub fn name(&self) -> String {
        format!("ResNet{}", 2 * self.blocks.iter().sum::<usize>() + 2)
    }

    /// Width of the pooled embedding returned by `featurize`.
    pub fn embedding_dim(&self) -> usize {
        self.base_width * STAGE_WIDTHS[3]
    }

    pub fn init<B: Backend>(&self, num_classes: usize, device: &B::Device) -> ResNet<B> {
        let conv1 = conv3x3(self.in_channels, self.base_width, 1, device);
        let bn1   = BatchNormConfig::new(self.base_width).init(device);

        let mut in_planes = self.base_width;
        let mut layers = Vec::with_capacity(STAGE_WIDTHS.len());
        for ((&width, &stride), &count) in STAGE_WIDTHS.iter().zip(&STAGE_STRIDES).zip(&self.blocks) {
            let planes = self.base_width * width;
            let stage: Vec<BasicBlock<B>> = (0..count)
                .map(|i| {
                    let block_stride = if i == 0 { stride } else { 1 };
                    let block = BasicBlock::new(in_planes, planes, block_stride, device);
                    in_planes = planes;
                    block
                })
                .collect();
            layers.push(stage);
        }

        let pool   = AdaptiveAvgPool2dConfig::new([1, 1]).init();
        let linear = LinearConfig::new(self.embedding_dim(), num_classes).init(device);
        ResNet { conv1, bn1, layers, pool, linear }
    }
}

fn conv3x3<B: Backend>(c_in: usize, c_out: usize, stride: usize, device: &B::Device) -> Conv2d<B> {
    Conv2dConfig::new([c_in, c_out], [3, 3])
        .with_stride([stride, stride])
        .with_padding(PaddingConfig2d::Explicit(1, 1))
        .with_bias(false)
        .init(device)
}

/// 1x1 projection used when a block changes width or resolution.
#[derive(Module, Debug)]
pub struct Shortcut<B: Backend> {
    pub conv: Conv2d<B>,
    pub bn:   BatchNorm<B>,
}

impl<B: Backend> Shortcut<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.bn.forward(self.conv.forward(x))
    }
}

#[derive(Module, Debug)]
pub struct BasicBlock<B: Backend> {
    pub conv1:    Conv2d<B>,
    pub bn1:      BatchNorm<B>,
    pub conv2:    Conv2d<B>,
    pub bn2:      BatchNorm<B>,
    pub shortcut: Option<Shortcut<B>>,
}

impl<B: Backend> BasicBlock<B> {
    pub fn new(in_planes: usize, planes: usize, stride: usize, device: &B::Device) -> Self {
        let shortcut = (stride != 1 || in_planes != planes).then(|| Shortcut {
            conv: Conv2dConfig::new([in_planes, planes], [1, 1])
                .with_stride([stride, stride])
                .with_bias(false)
                .init(device),
            bn: BatchNormConfig::new(planes).init(device),
        });

        Self {
            conv1: conv3x3(in_planes, planes, stride, device),
            bn1:   BatchNormConfig::new(planes).init(device),
            conv2: conv3x3(planes, planes, 1, device),
            bn2:   BatchNormConfig::new(planes).init(device),
            shortcut,
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let out = relu(self.bn1.forward(self.conv1.forward(x.clone())));
        let out = self.bn2.forward(self.conv2.forward(out));
        let identity = match &self.shortcut {
            Some(shortcut) => shortcut.forward(x),
            None           => x,
        };
        relu(out + identity)
    }
}

/// CIFAR-style residual network: 3x3 stem, four stages, global
/// average pool, linear classifier.
#[derive(Module, Debug)]
pub struct ResNet<B: Backend> {
    pub conv1:  Conv2d<B>,
    pub bn1:    BatchNorm<B>,
    pub layers: Vec<Vec<BasicBlock<B>>>,
    pub pool:   AdaptiveAvgPool2d,
    pub linear: Linear<B>,
}

impl<B: Backend> ResNet<B> {
    /// images: [batch, channels, height, width] → scores: [batch, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        self.linear.forward(self.featurize(images))
    }

    pub fn num_classes(&self) -> usize {
        self.linear.weight.val().dims()[1]
    }
}

impl<B: Backend> Featurize<B> for ResNet<B> {
    /// images: [batch, channels, height, width] → embedding: [batch, 8 * base_width]
    fn featurize(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = relu(self.bn1.forward(self.conv1.forward(images)));
        for block in self.layers.iter().flatten() {
            x = block.forward(x);
        }
        self.pool.forward(x).flatten::<2>(1, 3)
    }

    fn embedding_dim(&self) -> usize {
        self.linear.weight.val().dims()[0]
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    use crate::infra::checkpoint::{
        load_checkpoint, save_checkpoint, tensor_values, CheckpointMeta, LoadOutcome,
    };

    type TestBackend = NdArray;

    fn tiny() -> ResNetConfig {
        ResNetConfig::resnet10().with_base_width(4)
    }

    #[test]
    fn test_names_count_weighted_layers() {
        assert_eq!(ResNetConfig::resnet10().name(), "ResNet10");
        assert_eq!(ResNetConfig::resnet18().name(), "ResNet18");
    }

    #[test]
    fn test_forward_and_featurize_shapes() {
        let device = Default::default();
        let net: ResNet<TestBackend> = tiny().init(5, &device);
        let images = Tensor::<TestBackend, 4>::zeros([2, 3, 8, 8], &device);

        assert_eq!(net.forward(images.clone()).dims(), [2, 5]);
        assert_eq!(net.featurize(images).dims(), [2, 32]);
        assert_eq!(net.embedding_dim(), tiny().embedding_dim());
        assert_eq!(net.num_classes(), 5);
    }

    #[test]
    fn test_projection_only_where_shape_changes() {
        let device = Default::default();
        let net: ResNet<TestBackend> = tiny().init(3, &device);

        assert!(net.layers[0][0].shortcut.is_none());
        // stages 2-4 halve the resolution, so their first block projects
        assert!(net.layers[1..].iter().all(|stage| stage[0].shortcut.is_some()));
        assert_eq!(net.linear.weight.val().dims(), [32, 3]);
    }

    #[test]
    fn test_checkpoint_restores_every_tensor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resnet.bpk");
        let device = Default::default();
        let trained: ResNet<TestBackend> = tiny().init(3, &device);
        let fresh:   ResNet<TestBackend> = tiny().init(3, &device);

        save_checkpoint(&trained, &path, CheckpointMeta::default()).unwrap();
        let (loaded, outcome) = load_checkpoint(fresh, &path).unwrap();

        assert_eq!(outcome, LoadOutcome::Loaded);
        assert_eq!(tensor_values(&loaded), tensor_values(&trained));
    }
}
